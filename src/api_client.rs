use crate::error::AppError;
use crate::models::{Question, QuestionType};
use crate::skills::Skill;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

// --- Data Structures for API Communication ---

#[derive(Serialize)]
struct GenerateRequest<'a> {
    action: &'a str,
    skill: &'a str,
    proficiency: &'a str,
    sources: Vec<String>,
    model: &'a str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    questions: Option<Vec<Question>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateRequest<'a> {
    action: &'a str,
    skill: &'a str,
    proficiency: &'a str,
    user_answers: Vec<UserAnswer<'a>>,
    sources: Vec<String>,
    model: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserAnswer<'a> {
    id: u32,
    #[serde(rename = "type")]
    question_type: QuestionType,
    text: &'a str,
    user_answer: &'a str,
    correct_answer: &'a str,
}

#[derive(Deserialize, Debug)]
struct EvaluateResponse {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    feedback: Vec<Feedback>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(alias = "question_id")]
    pub question_id: u32,
    #[serde(default)]
    pub comment: String,
}

/// Result of a remote scoring call.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: u8,
    pub feedback: Vec<Feedback>,
}

/// Remote question generator and scorer.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    async fn generate_questions(&self, skill: &Skill) -> Result<Vec<Question>, AppError>;
    async fn evaluate_assessment(
        &self,
        skill: &Skill,
        questions: &[Question],
    ) -> Result<Evaluation, AppError>;
}

// --- API Client ---

const FUNCTIONS_PATH: &str = "/functions/v1/";
const GENERATE_ACTION: &str = "generate_questions";
const EVALUATE_ACTION: &str = "evaluate_assessment";

pub struct ApiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ApiClient {
    pub fn new(backend_url: &str, function_name: &str, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}{}{}",
                backend_url.trim_end_matches('/'),
                FUNCTIONS_PATH,
                function_name
            ),
            api_key,
            model,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<T: Serialize>(&self, body: &T) -> Result<String, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::InvalidApiKey);
        }
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl AssessmentApi for ApiClient {
    #[instrument(skip(self, skill), fields(skill_id = %skill.id, proficiency = %skill.proficiency))]
    async fn generate_questions(&self, skill: &Skill) -> Result<Vec<Question>, AppError> {
        let request = GenerateRequest {
            action: GENERATE_ACTION,
            skill: &skill.name,
            proficiency: skill.proficiency.as_str(),
            sources: Vec::new(),
            model: &self.model,
        };
        let body = self.post(&request).await?;
        debug!(bytes = body.len(), "Received generated questions");

        let questions = parse_generate_response(&body)?;
        info!(count = questions.len(), "Generated questions");
        Ok(questions)
    }

    #[instrument(skip(self, skill, questions), fields(skill_id = %skill.id, count = questions.len()))]
    async fn evaluate_assessment(
        &self,
        skill: &Skill,
        questions: &[Question],
    ) -> Result<Evaluation, AppError> {
        let request = EvaluateRequest {
            action: EVALUATE_ACTION,
            skill: &skill.name,
            proficiency: skill.proficiency.as_str(),
            user_answers: questions
                .iter()
                .map(|q| UserAnswer {
                    id: q.id,
                    question_type: q.question_type,
                    text: &q.text,
                    user_answer: &q.user_answer,
                    correct_answer: &q.correct_answer,
                })
                .collect(),
            sources: Vec::new(),
            model: &self.model,
        };
        let body = self.post(&request).await?;

        let evaluation = parse_evaluate_response(&body)?;
        info!(score = evaluation.score, "Assessment evaluated");
        Ok(evaluation)
    }
}

/// Validates a generation response and normalizes the questions for a fresh
/// session: answers and explanations are cleared, ids made unique.
fn parse_generate_response(body: &str) -> Result<Vec<Question>, AppError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(AppError::MalformedResponse(error));
    }
    let mut questions = response
        .questions
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::MalformedResponse("no questions returned".to_string()))?;

    for q in &questions {
        if q.text.trim().is_empty() {
            return Err(AppError::MalformedResponse(format!(
                "question {} has no text",
                q.id
            )));
        }
        if q.question_type == QuestionType::MultipleChoice && q.choices().len() < 2 {
            return Err(AppError::MalformedResponse(format!(
                "multiple choice question {} has fewer than two options",
                q.id
            )));
        }
    }

    let mut seen = HashSet::new();
    let unique_ids = questions.iter().all(|q| seen.insert(q.id));
    for (index, q) in questions.iter_mut().enumerate() {
        if !unique_ids {
            q.id = index as u32 + 1;
        }
        q.user_answer.clear();
        q.explanation.clear();
    }
    Ok(questions)
}

fn parse_evaluate_response(body: &str) -> Result<Evaluation, AppError> {
    let response: EvaluateResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(AppError::MalformedResponse(error));
    }
    let score = response
        .score
        .filter(|s| s.is_finite())
        .ok_or_else(|| AppError::MalformedResponse("missing score".to_string()))?;

    Ok(Evaluation {
        score: score.round().clamp(0.0, 100.0) as u8,
        feedback: response.feedback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_function_path() {
        let client = ApiClient::new(
            "https://example.supabase.co/",
            "skill-assessment",
            "key".to_string(),
            "model".to_string(),
        );
        assert_eq!(
            client.endpoint(),
            "https://example.supabase.co/functions/v1/skill-assessment"
        );
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            action: GENERATE_ACTION,
            skill: "SQL Joins",
            proficiency: "Skill",
            sources: Vec::new(),
            model: "m",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["action"], "generate_questions");
        assert_eq!(value["skill"], "SQL Joins");
        assert_eq!(value["proficiency"], "Skill");
        assert!(value["sources"].as_array().unwrap().is_empty());
        assert_eq!(value["model"], "m");
    }

    #[test]
    fn test_evaluate_request_shape() {
        let request = EvaluateRequest {
            action: EVALUATE_ACTION,
            skill: "SQL Joins",
            proficiency: "Skill",
            user_answers: vec![UserAnswer {
                id: 7,
                question_type: QuestionType::ShortAnswer,
                text: "What is a left join?",
                user_answer: "keeps all left rows",
                correct_answer: "all rows from the left table",
            }],
            sources: Vec::new(),
            model: "m",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["action"], "evaluate_assessment");
        let answer = &value["userAnswers"][0];
        assert_eq!(answer["id"], 7);
        assert_eq!(answer["type"], "shortAnswer");
        assert_eq!(answer["userAnswer"], "keeps all left rows");
        assert_eq!(answer["correctAnswer"], "all rows from the left table");
    }

    #[test]
    fn test_parse_generate_response() {
        let body = r#"{"questions": [
            {"id": 1, "type": "multipleChoice", "text": "Pick", "options": ["a", "b"], "correctAnswer": "a", "explanation": "early"},
            {"id": 2, "type": "trueFalse", "text": "Yes?", "correctAnswer": "True", "userAnswer": "False"}
        ]}"#;
        let questions = parse_generate_response(body).unwrap();
        assert_eq!(questions.len(), 2);
        assert!(questions[0].explanation.is_empty());
        assert!(questions[1].user_answer.is_empty());
        assert_eq!(questions[1].choices(), vec!["True", "False"]);
    }

    #[test]
    fn test_parse_generate_renumbers_duplicate_ids() {
        let body = r#"{"questions": [
            {"id": 1, "type": "shortAnswer", "text": "A"},
            {"id": 1, "type": "shortAnswer", "text": "B"},
            {"id": 1, "type": "codeSandbox", "text": "C"}
        ]}"#;
        let ids: Vec<u32> = parse_generate_response(body)
            .unwrap()
            .iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_generate_rejects_malformed() {
        for body in [
            r#"{"questions": []}"#,
            r#"{}"#,
            r#"{"error": "quota exhausted"}"#,
            r#"{"questions": [{"id": 1, "type": "multipleChoice", "text": "x", "options": ["only"]}]}"#,
            r#"{"questions": [{"id": 1, "type": "shortAnswer", "text": "  "}]}"#,
        ] {
            assert!(
                matches!(parse_generate_response(body), Err(AppError::MalformedResponse(_))),
                "accepted {}",
                body
            );
        }
        assert!(matches!(
            parse_generate_response("not json"),
            Err(AppError::ResponseParseError(_))
        ));
        assert!(matches!(
            parse_generate_response(r#"{"questions": [{"id": 1, "type": "essay", "text": "x"}]}"#),
            Err(AppError::ResponseParseError(_))
        ));
    }

    #[test]
    fn test_parse_evaluate_response() {
        let body = r#"{"score": 83.6, "feedback": [{"questionId": 2, "comment": "Close"}]}"#;
        let evaluation = parse_evaluate_response(body).unwrap();
        assert_eq!(evaluation.score, 84);
        assert_eq!(
            evaluation.feedback,
            vec![Feedback {
                question_id: 2,
                comment: "Close".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_evaluate_clamps_and_rejects() {
        assert_eq!(parse_evaluate_response(r#"{"score": 140}"#).unwrap().score, 100);
        assert_eq!(parse_evaluate_response(r#"{"score": -3}"#).unwrap().score, 0);
        assert!(matches!(
            parse_evaluate_response(r#"{"feedback": []}"#),
            Err(AppError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_evaluate_response(r#"{"score": 50, "error": "boom"}"#),
            Err(AppError::MalformedResponse(_))
        ));
    }
}
