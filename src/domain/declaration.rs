//! Declaration types: the catalogue of regulatory filings users submit

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// File format of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeclarationFormat {
    Txt,
    Xml,
}

/// Filing frequency of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeclarationFrequence {
    Journaliere,
    Mensuelle,
    Trimestrielle,
}

impl DeclarationFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationFormat::Txt => "TXT",
            DeclarationFormat::Xml => "XML",
        }
    }
}

impl std::str::FromStr for DeclarationFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TXT" => Ok(DeclarationFormat::Txt),
            "XML" => Ok(DeclarationFormat::Xml),
            _ => Err(format!("Unknown declaration format: {}", s)),
        }
    }
}

impl DeclarationFrequence {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationFrequence::Journaliere => "JOURNALIERE",
            DeclarationFrequence::Mensuelle => "MENSUELLE",
            DeclarationFrequence::Trimestrielle => "TRIMESTRIELLE",
        }
    }
}

impl std::str::FromStr for DeclarationFrequence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JOURNALIERE" => Ok(DeclarationFrequence::Journaliere),
            "MENSUELLE" => Ok(DeclarationFrequence::Mensuelle),
            "TRIMESTRIELLE" => Ok(DeclarationFrequence::Trimestrielle),
            _ => Err(format!("Unknown declaration frequency: {}", s)),
        }
    }
}

/// Stores an enum as its upper-case name in a VARCHAR column
macro_rules! varchar_enum {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl sqlx::Type<sqlx::MySql> for $ty {
            fn type_info() -> sqlx::mysql::MySqlTypeInfo {
                <String as sqlx::Type<sqlx::MySql>>::type_info()
            }

            fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::MySql>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::MySql> for $ty {
            fn decode(
                value: sqlx::mysql::MySqlValueRef<'r>,
            ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
                let s: String = sqlx::Decode::<'r, sqlx::MySql>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::MySql> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<u8>,
            ) -> std::result::Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::MySql>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

varchar_enum!(DeclarationFormat);
varchar_enum!(DeclarationFrequence);

/// Declaration type entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationType {
    pub id: i64,
    pub code: String,
    pub nom: Option<String>,
    pub format: Option<DeclarationFormat>,
    pub frequence: Option<DeclarationFrequence>,
    pub date_limite: Option<NaiveDate>,
    pub actif: bool,
}

/// Body of create and update requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationTypeInput {
    #[validate(length(min = 1, max = 50, message = "Code is required"))]
    pub code: String,
    #[validate(length(max = 255))]
    pub nom: Option<String>,
    pub format: Option<DeclarationFormat>,
    pub frequence: Option<DeclarationFrequence>,
    pub date_limite: Option<NaiveDate>,
    #[serde(default = "default_actif")]
    pub actif: bool,
}

fn default_actif() -> bool {
    true
}

impl DeclarationTypeInput {
    /// Code with surrounding whitespace removed
    pub fn normalized(self) -> Self {
        Self {
            code: self.code.trim().to_string(),
            ..self
        }
    }
}
