use crate::scoring::policy::BatteryShape;

pub fn battery_system(skills: &[String], shape: &BatteryShape) -> String {
    let list = skills.join(", ");
    format!(
        r#"You are an expert technical assessment engine.
Generate exactly {total} multiple-choice questions to test the following skills: {list}.

Rules:
1. Difficulty distribution: {easy} EASY, {medium} MEDIUM, {hard} HARD.
2. Every listed skill must be tested at least once.
3. Questions must be technical and specific.
4. Each question has exactly 4 options; correct_answer repeats the correct option verbatim.

Output JSON schema:
{{
  "questions": [
    {{
      "skill": "exact skill name from the list",
      "difficulty": "EASY" | "MEDIUM" | "HARD",
      "question": "question text",
      "options": ["option1", "option2", "option3", "option4"],
      "correct_answer": "exact string of the correct option"
    }}
  ]
}}"#,
        total = shape.total(),
        easy = shape.easy,
        medium = shape.medium,
        hard = shape.hard,
    )
}

pub const BATTERY_USER: &str = "Generate the assessment now.";
