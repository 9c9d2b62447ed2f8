// All extraction prompt templates. Replace `{cv_text}` before sending;
// `render_prompt` appends the JSON-only instruction.
//
// Each template demands a disjoint set of top-level keys so that merging
// step results can never overwrite an earlier step's contribution.

use crate::llm_cli::prompts::JSON_ONLY_INSTRUCTION;

pub fn render_prompt(template: &str, cv_text: &str) -> String {
    format!(
        "{}\n\n{JSON_ONLY_INSTRUCTION}",
        template.replace("{cv_text}", cv_text)
    )
}

pub const BASIC_INFO_PROMPT_TEMPLATE: &str = r#"Extract basic candidate information from this CV text and return ONLY a JSON object:

{cv_text}

Return ONLY this JSON structure (no other text):
{
  "name": "candidate full name",
  "email": "email address",
  "phone": "phone number",
  "linkedin": "linkedin url if present, else null",
  "github": "github url if present, else null",
  "summary": "brief professional summary (2-3 sentences)"
}"#;

pub const SKILLS_PROMPT_TEMPLATE: &str = r#"Extract all skills from this CV text and return ONLY a JSON object:

{cv_text}

Return ONLY this JSON structure (no other text):
{
  "skills": ["skill1", "skill2", "skill3", "etc"],
  "languages": ["spoken language 1", "spoken language 2"]
}

Include programming languages, frameworks, tools, cloud platforms, databases, and relevant soft skills in "skills". List human languages separately in "languages"."#;

pub const EXPERIENCE_PROMPT_TEMPLATE: &str = r#"Extract work experience from this CV text and return ONLY a JSON object:

{cv_text}

Return ONLY this JSON structure (no other text):
{
  "experience": [
    {
      "company": "Company Name",
      "position": "Job Title",
      "start_date": "YYYY or MM/YYYY",
      "end_date": "YYYY or MM/YYYY or Present",
      "is_current": false,
      "description": "Brief description of role",
      "achievements": ["achievement 1", "achievement 2"]
    }
  ]
}

Keep dates exactly as written on the CV. Set "is_current" to true for the candidate's present role."#;

pub const EDUCATION_PROMPT_TEMPLATE: &str = r#"Extract education information from this CV text and return ONLY a JSON object:

{cv_text}

Return ONLY this JSON structure (no other text):
{
  "education": [
    {
      "institution": "University/School Name",
      "degree": "Degree Name",
      "field_of_study": "Field if stated, else null",
      "start_date": "YYYY",
      "end_date": "YYYY",
      "gpa": "GPA if stated, else null",
      "achievements": ["honor or award"]
    }
  ]
}"#;

pub const PROJECTS_CERTS_PROMPT_TEMPLATE: &str = r#"Extract projects and certifications from this CV text and return ONLY a JSON object:

{cv_text}

Return ONLY this JSON structure (no other text):
{
  "projects": [
    {
      "name": "Project Name",
      "description": "Project description",
      "technologies": ["tech1", "tech2"],
      "url": "project url if stated, else null"
    }
  ],
  "certifications": ["Certification Name 1", "Certification Name 2"]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_embeds_cv_text_and_json_instruction() {
        let prompt = render_prompt(BASIC_INFO_PROMPT_TEMPLATE, "John Doe, Engineer");
        assert!(prompt.contains("John Doe, Engineer"));
        assert!(!prompt.contains("{cv_text}"));
        assert!(prompt.ends_with(JSON_ONLY_INSTRUCTION));
    }
}
