//! Answer grading: canonicalize the student's text and compare against the
//! question's recorded final answer.
//!
//! Numeric answers compare with a relative tolerance of 1e-6 for floats and
//! exactly for integers and tuples. Non-numeric answers compare by a
//! lowercase alphanumeric canonical form; the student's phrase may be a
//! substring of the fuller recorded answer.

use veda_core::Question;

const RELATIVE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Correct,
    Incorrect,
}

/// Grade a student's textual answer against the recorded final answer.
pub fn grade(student: &str, expected: &str) -> Grade {
    let student_numbers = extract_numbers(student);
    let expected_numbers = extract_numbers(expected);

    // tuple-style answers: same numbers, in order, all exact
    if expected_numbers.len() > 1 && student_numbers.len() == expected_numbers.len() {
        let mut sorted_student = student_numbers.clone();
        let mut sorted_expected = expected_numbers.clone();
        sorted_student.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted_expected.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if sorted_student
            .iter()
            .zip(&sorted_expected)
            .all(|(a, b)| numbers_match(*a, *b))
        {
            return Grade::Correct;
        }
    }

    // single-value numeric answers
    if let (Some(student_value), [expected_value]) =
        (single_number(student), expected_numbers.as_slice())
    {
        if numbers_match(student_value, *expected_value) {
            return Grade::Correct;
        }
    }

    // non-numeric answers by canonical text
    let canonical_student = canonical_text(student);
    let canonical_expected = canonical_text(expected);
    if !canonical_student.is_empty()
        && (canonical_student == canonical_expected
            || (canonical_student.len() >= 4 && canonical_expected.contains(&canonical_student)))
    {
        return Grade::Correct;
    }

    Grade::Incorrect
}

/// Grade against a question and pick the hint for this wrong attempt.
/// Returns `Ok(())` when correct, `Err(hint_text)` when wrong.
pub fn grade_with_hint<'q>(
    question: &'q Question,
    student: &str,
    wrong_attempts: u32,
) -> Result<(), Option<&'q str>> {
    match grade(student, &question.final_answer) {
        Grade::Correct => Ok(()),
        Grade::Incorrect => Err(question
            .hint_for_attempt(wrong_attempts)
            .map(|h| h.text.as_str())),
    }
}

fn numbers_match(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    // integers must match exactly
    if b.fract() == 0.0 && a.fract() == 0.0 {
        return false;
    }
    let scale = b.abs().max(a.abs());
    if scale == 0.0 {
        return a == b;
    }
    (a - b).abs() / scale <= RELATIVE_TOLERANCE
}

/// The student's answer as one number, if it is one: handles plain numbers,
/// fractions like `3/4`, percentages, units, currency, thousands commas,
/// and a leading `x =`.
fn single_number(text: &str) -> Option<f64> {
    let cleaned = strip_decoration(text);

    if let Ok(value) = cleaned.parse::<f64>() {
        return Some(value);
    }

    // a/b fractions
    if let Some((numerator, denominator)) = cleaned.split_once('/') {
        let n: f64 = numerator.trim().parse().ok()?;
        let d: f64 = denominator.trim().parse().ok()?;
        if d != 0.0 {
            return Some(n / d);
        }
        return None;
    }

    // percentages
    if let Some(raw) = cleaned.strip_suffix('%') {
        let value: f64 = raw.trim().parse().ok()?;
        return Some(value / 100.0);
    }

    // a lone number surrounded by words ("about 47 I think") does not count;
    // only accept when exactly one number remains after stripping units
    let numbers = extract_numbers(&cleaned);
    if numbers.len() == 1 && cleaned.split_whitespace().count() <= 2 {
        return Some(numbers[0]);
    }

    None
}

fn strip_decoration(text: &str) -> String {
    let mut cleaned = text.trim().to_lowercase();
    for prefix in ["x =", "x=", "y =", "y=", "answer:", "answer is", "="] {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.trim().to_string();
        }
    }
    cleaned = cleaned.replace(['₹', '$'], "");
    cleaned = cleaned.replace(',', "");
    for unit in [" sq cm", " cm", " m", " km", " kg", " degrees", " deg", " units", " rupees"] {
        if let Some(rest) = cleaned.strip_suffix(unit) {
            cleaned = rest.trim().to_string();
        }
    }
    cleaned.trim().to_string()
}

fn extract_numbers(text: &str) -> Vec<f64> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        let part_of_number = c.is_ascii_digit()
            || (*c == '.' && !current.is_empty())
            || (*c == '-'
                && current.is_empty()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()));
        if part_of_number {
            current.push(*c);
        } else if !current.is_empty() {
            if let Ok(value) = current.parse::<f64>() {
                numbers.push(value);
            }
            current.clear();
        }
    }
    if let Ok(value) = current.parse::<f64>() {
        numbers.push(value);
    }
    numbers
}

/// Lowercase alphanumeric words joined by single spaces.
pub fn canonical_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
