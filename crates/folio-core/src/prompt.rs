//! System prompt assembly: interpolates the portfolio document into the fixed
//! instruction block sent as the `system` message of every chat turn.
//!
//! Pure function of the document and the date. Every fact in the output comes
//! from the document; the anti-fabrication rule itself is an instruction to the
//! downstream model, not something enforced here.

use chrono::NaiveDate;
use std::fmt::Write;

use crate::portfolio::PortfolioDocument;

pub fn build_system_prompt(doc: &PortfolioDocument, today: NaiveDate) -> String {
    let person = &doc.personal_info;
    let mut out = String::with_capacity(1024);

    let _ = writeln!(
        out,
        "You are the AI assistant for {}'s portfolio site. Today's date is {}.",
        person.name,
        today.format("%Y-%m-%d")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "NAME: {}", person.name);
    let _ = writeln!(out, "ROLE: {}", person.title);
    let _ = writeln!(out, "LOCATION: {}", person.location);

    if !person.summary.trim().is_empty() {
        let _ = writeln!(out, "\nSUMMARY:\n{}", person.summary.trim());
    }

    if !doc.skills.is_empty() {
        let _ = writeln!(out, "\nSKILLS: {}", doc.skills.join(", "));
    }

    if !doc.experience.is_empty() {
        let _ = writeln!(out, "\nEXPERIENCE:");
        for entry in &doc.experience {
            let period = if entry.period.is_empty() {
                String::new()
            } else {
                format!(" ({})", entry.period)
            };
            let _ = writeln!(out, "- {}, {}{}", entry.role, entry.company, period);
            if let Some(summary) = entry.summary.as_deref().filter(|s| !s.trim().is_empty()) {
                let _ = writeln!(out, "  {}", summary.trim());
            }
        }
    }

    if !doc.education.is_empty() {
        let _ = writeln!(out, "\nEDUCATION:");
        for entry in &doc.education {
            let _ = writeln!(out, "- {}: {}", entry.institution, entry.program);
        }
    }

    let _ = writeln!(out, "\nCONTACT:");
    let _ = writeln!(out, "Phone: {}", person.contact.phone);
    let _ = writeln!(out, "LinkedIn: {}", person.contact.linkedin);
    let _ = writeln!(out, "Email: {}", person.contact.email);

    let _ = write!(
        out,
        "\nINSTRUCTIONS:\n\
         1. Keep responses under 50 words unless asked for details\n\
         2. Be direct and conversational\n\
         3. If the question is unrelated to this portfolio, politely redirect\n\
         4. Never make up information that is not in this profile\n\
         5. Encourage visitors to get in touch about opportunities"
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{
        ContactInfo, EducationEntry, ExperienceEntry, PersonalInfo, PortfolioDocument,
    };

    fn doc() -> PortfolioDocument {
        PortfolioDocument {
            personal_info: PersonalInfo {
                name: "Jordan Mensah".to_string(),
                title: "Full-Stack Engineer".to_string(),
                location: "Lisbon, Portugal".to_string(),
                summary: "Builds resilient web services.".to_string(),
                contact: ContactInfo {
                    phone: "+351 900 000 000".to_string(),
                    linkedin: "https://linkedin.com/in/jordanmensah".to_string(),
                    email: "jordan@example.com".to_string(),
                },
            },
            skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
            experience: vec![ExperienceEntry {
                company: "Acme".to_string(),
                role: "Senior Engineer".to_string(),
                period: "2020-Present".to_string(),
                summary: None,
            }],
            education: vec![EducationEntry {
                institution: "IST Lisbon".to_string(),
                program: "Computer Engineering".to_string(),
                period: None,
            }],
            projects: vec![],
            services: vec![],
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 8).unwrap()
    }

    #[test]
    fn prompt_contains_every_contact_field_verbatim() {
        let prompt = build_system_prompt(&doc(), date());
        assert!(prompt.contains("+351 900 000 000"));
        assert!(prompt.contains("https://linkedin.com/in/jordanmensah"));
        assert!(prompt.contains("jordan@example.com"));
    }

    #[test]
    fn prompt_interpolates_identity_and_date() {
        let prompt = build_system_prompt(&doc(), date());
        assert!(prompt.contains("Jordan Mensah"));
        assert!(prompt.contains("ROLE: Full-Stack Engineer"));
        assert!(prompt.contains("LOCATION: Lisbon, Portugal"));
        assert!(prompt.contains("2026-08-08"));
    }

    #[test]
    fn prompt_is_deterministic_for_fixed_inputs() {
        assert_eq!(
            build_system_prompt(&doc(), date()),
            build_system_prompt(&doc(), date())
        );
    }

    #[test]
    fn empty_sections_are_omitted_rather_than_fabricated() {
        let mut sparse = doc();
        sparse.skills.clear();
        sparse.experience.clear();
        sparse.education.clear();
        sparse.personal_info.summary.clear();
        let prompt = build_system_prompt(&sparse, date());
        assert!(!prompt.contains("SKILLS:"));
        assert!(!prompt.contains("EXPERIENCE:"));
        assert!(!prompt.contains("EDUCATION:"));
        assert!(!prompt.contains("SUMMARY:"));
        // The fixed scaffolding is still there.
        assert!(prompt.contains("CONTACT:"));
        assert!(prompt.contains("INSTRUCTIONS:"));
    }

    #[test]
    fn prompt_keeps_the_behavioral_rules() {
        let prompt = build_system_prompt(&doc(), date());
        assert!(prompt.contains("under 50 words"));
        assert!(prompt.contains("politely redirect"));
        assert!(prompt.contains("Never make up information"));
    }
}
