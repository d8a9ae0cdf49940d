use crate::models::credential::Certificate;

pub const COURSE_EVALUATION_SYSTEM: &str = r#"You are an expert course evaluator and industry skill analyst.
Evaluate an online course from its name, platform and provider, using public knowledge of the
course or comparable courses, typical syllabus structure, provider credibility and industry relevance.
Be critical and realistic, not generous. Beginner courses must not score high by default.

Produce:
1. overall_rating_R (0-10): industry relevance, curriculum depth, skill usefulness, provider reputation.
2. skills: the granular, specific hard skills actually taught (aim for 5-10), each with
   skill_rating_Si (0-10) for depth, practical clarity and industry usability. No vague or marketing terms.
3. real_life_application_A (0-10): hands-on assignments, real implementations, projects. Penalize theory-heavy courses.

Output format:
{
  "course_name": "string",
  "platform": "string",
  "provider": "string",
  "overall_rating_R": number,
  "real_life_application_A": number,
  "skills": [ { "skill_name": "string", "skill_rating_Si": number } ],
  "n": number,
  "evaluation_notes": "concise factual justification (1-2 lines)"
}"#;

pub fn course_evaluation_user(certificate: &Certificate) -> String {
    format!(
        "Course Name: \"{}\"\nPlatform: \"{}\"\nProvider: \"{}\"",
        certificate.name, certificate.platform, certificate.company_name
    )
}

pub const RESUME_CGPA_SYSTEM: &str = r#"You are a resume parser. Extract the CGPA/GPA from the provided resume text.

Rules:
- Look for "CGPA", "GPA", "Score" or "Grade" in the education section.
- If found (e.g. "9.5/10", "3.8", "85%"), return it as a string: { "cgpa": "9.5/10" }
- If NOT found, return { "cgpa": null }
- Do not invent values."#;

pub fn resume_cgpa_user(resume_text: &str) -> String {
    format!("Resume Content:\n{resume_text}")
}
