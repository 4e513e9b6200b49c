use crate::quiz::models::Question;

/// Grades a submitted answer against the question definition.
///
/// Exact match after trimming and case-folding, nothing fuzzier. A question
/// without a stored correct answer is open-ended and scores 0 until the host
/// rescores it manually.
pub fn grade(question: &Question, submitted: &str) -> (bool, i32) {
    let Some(correct) = &question.correct_answer else {
        return (false, 0);
    };

    if normalize(submitted) == normalize(correct) {
        (true, question.points)
    } else {
        (false, 0)
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
