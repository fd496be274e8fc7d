use crate::api_client::AssessmentApi;
use crate::models::{Question, QuestionType};
use crate::skills::{Proficiency, Skill};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionOrigin {
    Remote,
    Fallback,
}

/// Questions for one session, with the generator error when the local
/// fallback had to be used.
#[derive(Clone, Debug)]
pub struct QuestionBatch {
    pub questions: Vec<Question>,
    pub origin: QuestionOrigin,
    pub error: Option<String>,
}

/// Asks the remote generator once. Any failure is absorbed and replaced by
/// the fixed fallback set so the session can always continue.
pub async fn fetch_questions(api: &dyn AssessmentApi, skill: &Skill) -> QuestionBatch {
    match api.generate_questions(skill).await {
        Ok(questions) => QuestionBatch {
            questions,
            origin: QuestionOrigin::Remote,
            error: None,
        },
        Err(e) => {
            warn!(skill_id = %skill.id, error = %e, "Question generation failed; using fallback set");
            QuestionBatch {
                questions: fallback_questions(&skill.name, skill.proficiency),
                origin: QuestionOrigin::Fallback,
                error: Some(e.to_string()),
            }
        }
    }
}

/// One question of every type with placeholder answers.
pub fn fallback_questions(skill_name: &str, proficiency: Proficiency) -> Vec<Question> {
    vec![
        Question {
            id: 1,
            question_type: QuestionType::MultipleChoice,
            text: format!(
                "Which statement best describes {} at the {} level?",
                skill_name, proficiency
            ),
            options: Some(vec![
                format!("Applying {} effectively in real situations", skill_name),
                format!("Having heard of {} but never used it", skill_name),
                format!("Avoiding {} whenever possible", skill_name),
                "None of the above".to_string(),
            ]),
            correct_answer: format!("Applying {} effectively in real situations", skill_name),
            user_answer: String::new(),
            explanation: format!(
                "Competence in {} is shown by applying it, not only knowing about it.",
                skill_name
            ),
        },
        Question {
            id: 2,
            question_type: QuestionType::TrueFalse,
            text: format!(
                "Regular practice is important for improving {}.",
                skill_name
            ),
            options: Some(vec!["True".to_string(), "False".to_string()]),
            correct_answer: "True".to_string(),
            user_answer: String::new(),
            explanation: "Deliberate, regular practice is how proficiency grows.".to_string(),
        },
        Question {
            id: 3,
            question_type: QuestionType::ShortAnswer,
            text: format!(
                "Briefly describe a situation where you would use {}.",
                skill_name
            ),
            options: None,
            correct_answer: format!(
                "Any concrete scenario that applies {} appropriately.",
                skill_name
            ),
            user_answer: String::new(),
            explanation: "A good answer names a specific, realistic use case.".to_string(),
        },
        Question {
            id: 4,
            question_type: QuestionType::CodeSandbox,
            text: format!(
                "Write a short snippet or outline that demonstrates {}.",
                skill_name
            ),
            options: None,
            correct_answer: format!("// A working example that demonstrates {}", skill_name),
            user_answer: String::new(),
            explanation: "Reference solutions vary; correctness and clarity matter most."
                .to_string(),
        },
    ]
}
