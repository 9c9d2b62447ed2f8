//! Progressive CV parsing — sequences category extraction steps and merges
//! their results into one candidate mapping.
//!
//! Flow per step: render prompt → invoke model → recover JSON → merge keys →
//! emit `completed`. A failed step emits `error` and the run continues;
//! partial profiles are the policy. There is no retry and no cross-step
//! rollback. Finalization persists the union of all completed steps.

pub mod events;
pub mod handlers;
pub mod prompts;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, map::Entry, Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::llm_cli::json::extract_json_object;
use crate::llm_cli::{InvokeError, ModelInvoker};
use crate::models::candidate::CandidateProfile;
use events::{ProgressEvent, Step};
use prompts::render_prompt;

/// One extraction category: the step tag and its prompt template.
pub struct StepSpec {
    pub step: Step,
    pub template: &'static str,
}

/// The five extraction categories, in execution order. Their prompt
/// templates request disjoint top-level keys.
pub const EXTRACTION_STEPS: [StepSpec; 5] = [
    StepSpec {
        step: Step::BasicInfo,
        template: prompts::BASIC_INFO_PROMPT_TEMPLATE,
    },
    StepSpec {
        step: Step::Skills,
        template: prompts::SKILLS_PROMPT_TEMPLATE,
    },
    StepSpec {
        step: Step::Experience,
        template: prompts::EXPERIENCE_PROMPT_TEMPLATE,
    },
    StepSpec {
        step: Step::Education,
        template: prompts::EDUCATION_PROMPT_TEMPLATE,
    },
    StepSpec {
        step: Step::ProjectsCerts,
        template: prompts::PROJECTS_CERTS_PROMPT_TEMPLATE,
    },
];

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error(transparent)]
    Json(#[from] crate::llm_cli::json::JsonRecoveryError),
}

/// Result of one full extraction run.
pub struct ParseOutcome {
    pub candidate_data: Map<String, Value>,
    pub file_saved: Option<PathBuf>,
    pub step_errors: Vec<(Step, String)>,
}

/// Drives one CV through every extraction category.
pub struct ProgressiveParser {
    cv_text: String,
    filename: String,
    parsed_dir: PathBuf,
    step_timeout: Duration,
    invoker: Arc<dyn ModelInvoker>,
    candidate_data: Map<String, Value>,
}

impl ProgressiveParser {
    pub fn new(
        cv_text: String,
        filename: String,
        parsed_dir: PathBuf,
        step_timeout: Duration,
        invoker: Arc<dyn ModelInvoker>,
    ) -> Self {
        Self {
            cv_text,
            filename,
            parsed_dir,
            step_timeout,
            invoker,
            candidate_data: Map::new(),
        }
    }

    /// Runs the complete progressive parse, emitting events on `tx`.
    ///
    /// Send failures are ignored: a consumer that disconnects mid-run must
    /// not abort extraction — the profile is still persisted.
    pub async fn run(mut self, tx: mpsc::Sender<ProgressEvent>) -> ParseOutcome {
        let _ = tx.send(ProgressEvent::starting(Step::Initialize)).await;
        info!(filename = %self.filename, "starting progressive CV parse");
        let _ = tx
            .send(ProgressEvent::completed(Step::Initialize, None))
            .await;

        let mut step_errors = Vec::new();
        for spec in &EXTRACTION_STEPS {
            if let Err(message) = self.run_step(spec, &tx).await {
                step_errors.push((spec.step, message));
            }
        }

        let file_saved = self.finalize(&tx).await;

        ParseOutcome {
            candidate_data: self.candidate_data,
            file_saved,
            step_errors,
        }
    }

    /// One extraction category: exactly one terminal `completed` or `error`
    /// event is emitted before returning.
    async fn run_step(
        &mut self,
        spec: &StepSpec,
        tx: &mpsc::Sender<ProgressEvent>,
    ) -> Result<(), String> {
        let _ = tx.send(ProgressEvent::starting(spec.step)).await;
        let _ = tx
            .send(ProgressEvent::processing(spec.step, "Querying model"))
            .await;

        match self.extract_category(spec).await {
            Ok(fragment) => {
                debug!(step = spec.step.as_str(), keys = fragment.len(), "step completed");
                let _ = tx
                    .send(ProgressEvent::completed(
                        spec.step,
                        Some(Value::Object(fragment.clone())),
                    ))
                    .await;
                self.merge(spec.step, fragment);
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(step = spec.step.as_str(), error = %message, "step failed; continuing");
                let _ = tx
                    .send(ProgressEvent::error(spec.step, message.clone()))
                    .await;
                Err(message)
            }
        }
    }

    async fn extract_category(&self, spec: &StepSpec) -> Result<Map<String, Value>, StepError> {
        let prompt = render_prompt(spec.template, &self.cv_text);
        let raw = self.invoker.query(&prompt, self.step_timeout).await?;
        Ok(extract_json_object(&raw)?)
    }

    /// Merges a step's keys into the cumulative mapping. Steps request
    /// disjoint keys; if the model misbehaves, the first writer wins.
    fn merge(&mut self, step: Step, fragment: Map<String, Value>) {
        for (key, value) in fragment {
            match self.candidate_data.entry(key) {
                Entry::Occupied(entry) => {
                    warn!(
                        step = step.as_str(),
                        key = %entry.key(),
                        "step attempted to overwrite an existing field; keeping first value"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
    }

    /// Persists the cumulative mapping and emits the final event.
    /// Returns the saved path, or `None` if persistence failed.
    async fn finalize(&mut self, tx: &mpsc::Sender<ProgressEvent>) -> Option<PathBuf> {
        let _ = tx.send(ProgressEvent::starting(Step::Finalize)).await;

        let total_skills = self.count("skills");
        let total_experience = self.count("experience");
        let total_education = self.count("education");
        let _ = tx
            .send(ProgressEvent::processing(
                Step::Finalize,
                &format!(
                    "Profile summary: {total_skills} skills, {total_experience} experience entries, {total_education} education entries"
                ),
            ))
            .await;

        match self.persist().await {
            Ok(path) => {
                // The raw union is authoritative; typed validation is advisory.
                match serde_json::from_value::<CandidateProfile>(Value::Object(
                    self.candidate_data.clone(),
                )) {
                    Ok(profile) => debug!(candidate = %profile.name, "merged profile validated"),
                    Err(e) => warn!("merged profile failed typed validation: {e}"),
                }

                info!(file = %path.display(), "CV parse complete");
                let _ = tx
                    .send(ProgressEvent::completed(
                        Step::Finalize,
                        Some(json!({
                            "candidate_data": self.candidate_data,
                            "file_saved": path.display().to_string(),
                        })),
                    ))
                    .await;
                Some(path)
            }
            Err(e) => {
                warn!("failed to persist parsed profile: {e}");
                let _ = tx
                    .send(ProgressEvent::error(Step::Finalize, e.to_string()))
                    .await;
                None
            }
        }
    }

    async fn persist(&self) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.parsed_dir).await?;

        let stem = Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("cv");
        let path = self.parsed_dir.join(format!("{stem}_structured.json"));

        let body = serde_json::to_string_pretty(&self.candidate_data)?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }

    fn count(&self, key: &str) -> usize {
        self.candidate_data
            .get(key)
            .and_then(|v| v.as_array())
            .map(|a| a.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::events::StepStatus;
    use super::*;
    use async_trait::async_trait;

    /// Deterministic invoker: answers by matching a distinctive substring
    /// of each category prompt.
    struct MockInvoker {
        responses: Vec<(&'static str, String)>,
    }

    #[async_trait]
    impl ModelInvoker for MockInvoker {
        async fn query(&self, prompt: &str, _limit: Duration) -> Result<String, InvokeError> {
            for (needle, response) in &self.responses {
                if prompt.contains(needle) {
                    return Ok(response.clone());
                }
            }
            Err(InvokeError::EmptyResponse)
        }
    }

    fn full_mock() -> MockInvoker {
        MockInvoker {
            responses: vec![
                (
                    "Extract basic candidate information",
                    r#"{"name": "John Doe", "email": "john@example.com", "phone": "(555) 123-4567", "summary": "Engineer."}"#.to_string(),
                ),
                (
                    "Extract all skills",
                    r#"{"skills": ["Rust", "Python"], "languages": ["English"]}"#.to_string(),
                ),
                (
                    "Extract work experience",
                    r#"{"experience": [{"company": "TechCorp", "position": "Senior Engineer", "start_date": "2021", "end_date": "Present", "is_current": true}]}"#.to_string(),
                ),
                (
                    "Extract education information",
                    r#"{"education": [{"institution": "State University", "degree": "BS Computer Science"}]}"#.to_string(),
                ),
                (
                    "Extract projects and certifications",
                    r#"{"projects": [], "certifications": ["AWS SAA"]}"#.to_string(),
                ),
            ],
        }
    }

    fn parser_with(
        invoker: MockInvoker,
        parsed_dir: &Path,
        filename: &str,
    ) -> ProgressiveParser {
        ProgressiveParser::new(
            "John Doe\njohn@example.com\n(555) 123-4567\nSenior Engineer at TechCorp".to_string(),
            filename.to_string(),
            parsed_dir.to_path_buf(),
            Duration::from_secs(45),
            Arc::new(invoker),
        )
    }

    async fn run_collecting(
        parser: ProgressiveParser,
    ) -> (ParseOutcome, Vec<ProgressEvent>) {
        let (tx, mut rx) = mpsc::channel(64);
        let outcome = parser.run(tx).await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (outcome, events)
    }

    #[tokio::test]
    async fn test_merge_is_union_of_disjoint_steps() {
        let dir = tempfile::tempdir().unwrap();
        let (outcome, _) = run_collecting(parser_with(full_mock(), dir.path(), "cv.txt")).await;

        assert!(outcome.step_errors.is_empty());
        let data = &outcome.candidate_data;
        assert_eq!(data["name"], "John Doe");
        assert_eq!(data["skills"].as_array().unwrap().len(), 2);
        assert_eq!(data["experience"][0]["company"], "TechCorp");
        assert_eq!(data["education"][0]["degree"], "BS Computer Science");
        assert_eq!(data["certifications"][0], "AWS SAA");
        assert_eq!(data["languages"][0], "English");
    }

    #[tokio::test]
    async fn test_each_step_emits_one_terminal_event() {
        let dir = tempfile::tempdir().unwrap();
        let (_, events) = run_collecting(parser_with(full_mock(), dir.path(), "cv.txt")).await;

        for spec in &EXTRACTION_STEPS {
            let terminals = events
                .iter()
                .filter(|e| {
                    e.step == spec.step
                        && matches!(e.status, StepStatus::Completed | StepStatus::Error)
                })
                .count();
            assert_eq!(terminals, 1, "step {} terminals", spec.step.as_str());

            let starts = events
                .iter()
                .filter(|e| e.step == spec.step && e.status == StepStatus::Starting)
                .count();
            assert_eq!(starts, 1, "step {} starts", spec.step.as_str());
        }

        // The run opens with initialize and ends with the finalize terminal.
        assert_eq!(events.first().unwrap().step, Step::Initialize);
        let last = events.last().unwrap();
        assert_eq!(last.step, Step::Finalize);
        assert_eq!(last.status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_unparsable_skills_response_does_not_halt_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut invoker = full_mock();
        invoker.responses[1].1 = "I'm sorry, I can't produce JSON for that.".to_string();

        let (outcome, events) =
            run_collecting(parser_with(invoker, dir.path(), "cv.txt")).await;

        assert_eq!(outcome.step_errors.len(), 1);
        assert_eq!(outcome.step_errors[0].0, Step::Skills);

        for step in [
            Step::BasicInfo,
            Step::Experience,
            Step::Education,
            Step::ProjectsCerts,
        ] {
            assert!(
                events
                    .iter()
                    .any(|e| e.step == step && e.status == StepStatus::Completed),
                "step {} should complete",
                step.as_str()
            );
        }

        let finalize = events
            .iter()
            .find(|e| e.step == Step::Finalize && e.status == StepStatus::Completed)
            .expect("finalize completes");
        let data = &finalize.data.as_ref().unwrap()["candidate_data"];
        assert!(data.get("skills").is_none());
        assert!(data.get("name").is_some());
        assert!(data.get("experience").is_some());
    }

    #[tokio::test]
    async fn test_persisted_file_matches_basic_info_literals() {
        let dir = tempfile::tempdir().unwrap();
        let (outcome, _) =
            run_collecting(parser_with(full_mock(), dir.path(), "john_cv.txt")).await;

        let path = outcome.file_saved.expect("profile persisted");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "john_cv_structured.json"
        );

        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["name"], "John Doe");
        assert_eq!(saved["email"], "john@example.com");
        assert_eq!(saved["phone"], "(555) 123-4567");
    }

    #[tokio::test]
    async fn test_run_survives_dropped_receiver() {
        let dir = tempfile::tempdir().unwrap();
        let parser = parser_with(full_mock(), dir.path(), "cv.txt");

        let (tx, rx) = mpsc::channel(64);
        drop(rx);
        let outcome = parser.run(tx).await;

        assert!(outcome.file_saved.is_some());
        assert_eq!(outcome.candidate_data["name"], "John Doe");
    }

    #[tokio::test]
    async fn test_first_writer_wins_on_key_collision() {
        let dir = tempfile::tempdir().unwrap();
        let mut invoker = full_mock();
        // A misbehaving skills response that repeats the name key.
        invoker.responses[1].1 =
            r#"{"skills": ["Rust"], "name": "Someone Else"}"#.to_string();

        let (outcome, _) = run_collecting(parser_with(invoker, dir.path(), "cv.txt")).await;
        assert_eq!(outcome.candidate_data["name"], "John Doe");
        assert_eq!(outcome.candidate_data["skills"][0], "Rust");
    }
}
