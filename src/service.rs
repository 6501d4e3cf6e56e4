use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ParlanceError, Result};

const FORMULA_MODEL: &str = "gpt-4o-mini";
const COMPLETION_MODEL: &str = "gpt-4o";

/// Bumped whenever the formula's variables or prompt change
pub const FORMULA_VERSION: u32 = 1;

/// Language pair of the learner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Languages {
    pub user_lang: String,
    pub target_lang: String,
}

impl From<&Config> for Languages {
    fn from(cfg: &Config) -> Self {
        Self {
            user_lang: cfg.user_lang.clone(),
            target_lang: cfg.target_lang.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhraseRequest<'a> {
    pub keyword: &'a str,
    pub languages: &'a Languages,
    pub difficulty: &'a str,
}

/// Verdict on one translation attempt
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Grade {
    pub correct: bool,
    #[serde(default)]
    pub lesson: String,
}

impl Grade {
    pub const GRADING_ERROR_LESSON: &'static str = "Error grading input";

    pub fn grading_error() -> Self {
        Self {
            correct: false,
            lesson: Self::GRADING_ERROR_LESSON.to_string(),
        }
    }
}

/// The generation, grading and explanation collaborators of a lesson
pub trait LessonService {
    /// `None` means "try again"
    fn generate_phrase(&self, request: &PhraseRequest) -> Option<String>;
    fn grade(&self, user_input: &str, correct_phrase: &str, languages: &Languages) -> Result<Grade>;
    fn explain(&self, phrase: &str, languages: &Languages) -> Result<Option<String>>;
}

#[derive(Debug, Serialize)]
struct Variable {
    name: &'static str,
    value: String,
}

impl Variable {
    fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Prompt {
    text: String,
}

#[derive(Debug, Serialize)]
struct FormulaData {
    name: &'static str,
    description: &'static str,
    variables: Vec<Variable>,
    model: &'static str,
    prompts: Vec<Prompt>,
}

#[derive(Debug, Deserialize)]
struct CreatedFormula {
    id: String,
}

#[derive(Debug, Serialize)]
struct CompletionData {
    models: Vec<&'static str>,
    variables: Vec<Variable>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    chat: Chat,
}

#[derive(Debug, Deserialize)]
struct Chat {
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    role: String,
    content: String,
}

/// Blocking client for the Formulaic completion API
#[derive(Debug, Clone)]
pub struct FormulaicClient {
    http: Client,
    base_url: String,
    api_key: String,
    formula_id: String,
    difficulty: String,
}

impl FormulaicClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            formula_id: cfg.formula_id.clone(),
            difficulty: cfg.difficulty.clone(),
        })
    }

    pub fn formula_id(&self) -> &str {
        &self.formula_id
    }

    /// Registers the phrase formula and switches this client over to it
    pub fn create_formula(&mut self, languages: &Languages) -> Result<String> {
        let formula = phrase_formula(languages, &self.difficulty);

        let created: CreatedFormula = self
            .http
            .post(format!("{}/formulas", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&formula)
            .send()?
            .error_for_status()?
            .json()?;

        debug!(formula_id = %created.id, "formula created");
        self.formula_id = created.id.clone();
        Ok(created.id)
    }

    fn complete(&self, languages: &Languages, instructions: String) -> Result<String> {
        let data = CompletionData {
            models: vec![COMPLETION_MODEL],
            variables: vec![
                Variable::new("userLang", &languages.user_lang),
                Variable::new("targetLang", &languages.target_lang),
                Variable::new("difficulty", &self.difficulty),
                Variable::new("instructions", instructions),
            ],
        };

        let completions: Vec<Completion> = self
            .http
            .post(format!(
                "{}/formulas/{}/completions",
                self.base_url, self.formula_id
            ))
            .bearer_auth(&self.api_key)
            .json(&data)
            .send()?
            .error_for_status()?
            .json()?;

        last_assistant_message(completions)
    }
}

/// A stored formula id is reusable only if it was created with the current variables and prompt
pub fn needs_formula(cfg: &Config) -> bool {
    cfg.formula_id.trim().is_empty() || cfg.formula_version < FORMULA_VERSION
}

fn phrase_formula(languages: &Languages, difficulty: &str) -> FormulaData {
    FormulaData {
        name: "Language Learning Phrase Generator",
        description:
            "Generates phrases in the target language with highlighted keywords for learning.",
        variables: vec![
            Variable::new("userLang", &languages.user_lang),
            Variable::new("targetLang", &languages.target_lang),
            Variable::new("difficulty", difficulty),
            Variable::new("instructions", ""),
        ],
        model: FORMULA_MODEL,
        prompts: vec![Prompt {
            text: "You are helping a {{{userLang}}} speaker learn {{{targetLang}}}.\n\
                   {{{instructions}}}\n\
                   Only provide plain text, no formatting."
                .to_string(),
        }],
    }
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl LessonService for FormulaicClient {
    fn generate_phrase(&self, request: &PhraseRequest) -> Option<String> {
        let instructions = format!(
            "Generate a {} difficulty phrase in {} for a {} speaker, built around the keyword \"{}\". \
             Only provide the phrase in {}.",
            request.difficulty,
            request.languages.target_lang,
            request.languages.user_lang,
            request.keyword,
            request.languages.target_lang,
        );

        match self.complete(request.languages, instructions) {
            Ok(text) => {
                let phrase = non_blank(&text);
                if phrase.is_none() {
                    warn!(keyword = request.keyword, "service returned an empty phrase");
                }
                phrase
            }
            Err(err) => {
                warn!(keyword = request.keyword, error = %err, "error fetching new phrase");
                None
            }
        }
    }

    fn grade(&self, user_input: &str, correct_phrase: &str, languages: &Languages) -> Result<Grade> {
        let instructions = format!(
            "The learner translated the {} phrase \"{}\" into {} as \"{}\". \
             Decide whether the translation is correct in meaning. \
             Reply only with JSON of the form {{\"correct\": true or false, \"lesson\": \"a short lesson in {}\"}}.",
            languages.target_lang, correct_phrase, languages.user_lang, user_input, languages.user_lang,
        );
        parse_grade(&self.complete(languages, instructions)?)
    }

    fn explain(&self, phrase: &str, languages: &Languages) -> Result<Option<String>> {
        let instructions = format!(
            "Explain in {} the meaning, vocabulary and grammar of the {} phrase \"{}\".",
            languages.user_lang, languages.target_lang, phrase,
        );
        Ok(non_blank(&self.complete(languages, instructions)?))
    }
}

fn last_assistant_message(completions: Vec<Completion>) -> Result<String> {
    completions
        .into_iter()
        .next()
        .and_then(|completion| {
            completion
                .chat
                .messages
                .into_iter()
                .rev()
                .find(|message| message.role == "assistant")
        })
        .map(|message| message.content)
        .ok_or_else(|| ParlanceError::Service("completion without an assistant message".into()))
}

/// Reads the grader's JSON verdict, tolerating a surrounding code fence
pub fn parse_grade(content: &str) -> Result<Grade> {
    let body = content.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .unwrap_or(body);
    let body = body.strip_suffix("```").unwrap_or(body).trim();

    serde_json::from_str(body)
        .map_err(|err| ParlanceError::Service(format!("unreadable grade {content:?}: {err}")))
}

/// Test collaborator answering from queued responses
#[derive(Debug, Default)]
pub struct ScriptedService {
    phrases: RefCell<VecDeque<Option<String>>>,
    grades: RefCell<VecDeque<std::result::Result<Grade, String>>>,
    explanations: RefCell<VecDeque<std::result::Result<Option<String>, String>>>,
    pub phrase_requests: RefCell<Vec<String>>,
    pub grade_requests: RefCell<Vec<(String, String)>>,
    pub explain_requests: RefCell<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phrase(self, text: &str) -> Self {
        self.phrases.borrow_mut().push_back(Some(text.to_string()));
        self
    }

    pub fn no_phrase(self) -> Self {
        self.phrases.borrow_mut().push_back(None);
        self
    }

    pub fn verdict(self, correct: bool, lesson: &str) -> Self {
        self.grades.borrow_mut().push_back(Ok(Grade {
            correct,
            lesson: lesson.to_string(),
        }));
        self
    }

    pub fn verdict_failure(self, reason: &str) -> Self {
        self.grades.borrow_mut().push_back(Err(reason.to_string()));
        self
    }

    pub fn explanation(self, text: Option<&str>) -> Self {
        self.explanations
            .borrow_mut()
            .push_back(Ok(text.map(str::to_string)));
        self
    }

    pub fn explanation_failure(self, reason: &str) -> Self {
        self.explanations
            .borrow_mut()
            .push_back(Err(reason.to_string()));
        self
    }
}

impl LessonService for ScriptedService {
    fn generate_phrase(&self, request: &PhraseRequest) -> Option<String> {
        self.phrase_requests
            .borrow_mut()
            .push(request.keyword.to_string());
        self.phrases.borrow_mut().pop_front().flatten()
    }

    fn grade(&self, user_input: &str, correct_phrase: &str, _languages: &Languages) -> Result<Grade> {
        self.grade_requests
            .borrow_mut()
            .push((user_input.to_string(), correct_phrase.to_string()));
        match self.grades.borrow_mut().pop_front() {
            Some(Ok(grade)) => Ok(grade),
            Some(Err(reason)) => Err(ParlanceError::Service(reason)),
            None => Err(ParlanceError::Service("no grade scripted".into())),
        }
    }

    fn explain(&self, phrase: &str, _languages: &Languages) -> Result<Option<String>> {
        self.explain_requests.borrow_mut().push(phrase.to_string());
        match self.explanations.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(ParlanceError::Service(reason)),
            None => Ok(None),
        }
    }
}
