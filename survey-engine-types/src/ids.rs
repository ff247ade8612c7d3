use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the raw identifier.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Identifier of the project a survey and its publications belong to.
    ProjectId
);
id_type!(
    /// Identifier of a survey.
    SurveyId
);
id_type!(
    /// Identifier of a page within a survey.
    PageId
);
id_type!(
    /// Identifier of an item within a page.
    ItemId
);
id_type!(
    /// Identifier of a participant (the respondent identity).
    ParticipantId
);
id_type!(
    /// Identifier of a persisted answer.
    AnswerId
);
id_type!(
    /// Identifier of a publication.
    PublicationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&ItemId(42)).unwrap();
        assert_eq!(json, "42");

        let id: PageId = serde_json::from_str("7").unwrap();
        assert_eq!(id, PageId(7));
    }

    #[test]
    fn display() {
        assert_eq!(ParticipantId(3).to_string(), "3");
    }
}
