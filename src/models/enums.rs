use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string tag is both the stored column value and the serde name.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Relationship {
    Myself => "self",
    Child => "child",
    Parent => "parent",
    Spouse => "spouse",
});

str_enum!(RecordType {
    Blood => "blood",
    Imaging => "imaging",
    Prescription => "prescription",
    Diagnosis => "diagnosis",
    Other => "other",
});

str_enum!(DiseaseType {
    Hypertension => "hypertension",
    Diabetes => "diabetes",
    Asthma => "asthma",
    Heart => "heart",
    Other => "other",
});

str_enum!(ReminderType {
    Medication => "medication",
    Checkup => "checkup",
    Test => "test",
});
