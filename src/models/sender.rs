use serde::{Deserialize, Serialize};

/// Who is sending: a private person or a business account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SenderProfile {
    Individual {
        first_name: String,
        last_name: String,
    },
    Professional {
        company_name: String,
        contact_name: Option<String>,
    },
}

impl SenderProfile {
    pub fn display_name(&self) -> String {
        match self {
            SenderProfile::Individual {
                first_name,
                last_name,
            } => format!("{} {}", first_name.trim(), last_name.trim())
                .trim()
                .to_string(),
            SenderProfile::Professional {
                company_name,
                contact_name: Some(contact),
            } if !contact.trim().is_empty() => {
                format!("{} ({})", company_name.trim(), contact.trim())
            }
            SenderProfile::Professional { company_name, .. } => company_name.trim().to_string(),
        }
    }
}
