use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type ParticipantId = String;
pub type ExpenseId = String;

/// Reserved id of the traveler who owns the trip.
pub const TRIP_OWNER_ID: &str = "main_user";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_group: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            family_group: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Accommodation,
    Transport,
    Food,
    Activities,
    Shopping,
    Other,
    Custom(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Accommodation => "accommodation",
            Category::Transport => "transport",
            Category::Food => "food",
            Category::Activities => "activities",
            Category::Shopping => "shopping",
            Category::Other => "other",
            Category::Custom(name) => name,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "accommodation" => Category::Accommodation,
            "transport" => Category::Transport,
            "food" => Category::Food,
            "activities" => Category::Activities,
            "shopping" => Category::Shopping,
            "other" => Category::Other,
            _ => Category::Custom(value),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Custom(name) => name,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an expense is shared between travelers.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "splitType", rename_all = "camelCase")]
pub enum Split {
    /// Divided evenly; leftover minor units go to the first ids in order.
    Equal { beneficiaries: BTreeSet<ParticipantId> },
    /// Divided per explicit amounts, which must add up to the expense amount.
    Custom {
        #[serde(rename = "splitAmounts")]
        split_amounts: BTreeMap<ParticipantId, Decimal>,
    },
    /// Personal spend of the payer, never shared.
    None,
}

impl Split {
    pub fn equal<I, S>(beneficiaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ParticipantId>,
    {
        Split::Equal {
            beneficiaries: beneficiaries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn custom<I, S>(split_amounts: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<ParticipantId>,
    {
        Split::Custom {
            split_amounts: split_amounts
                .into_iter()
                .map(|(id, amount)| (id.into(), amount))
                .collect(),
        }
    }

    pub fn is_shared(&self) -> bool {
        !matches!(self, Split::None)
    }

    pub fn beneficiaries(&self) -> Box<dyn Iterator<Item = &ParticipantId> + '_> {
        match self {
            Split::Equal { beneficiaries } => Box::new(beneficiaries.iter()),
            Split::Custom { split_amounts } => Box::new(split_amounts.keys()),
            Split::None => Box::new(std::iter::empty()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    #[serde(default)]
    pub title: String,
    pub amount: Decimal,
    pub category: Category,
    pub paid_by: ParticipantId,
    #[serde(flatten)]
    pub split: Split,
    pub created_at: DateTime<Utc>,
}

/// An expense as submitted by a caller, before the ledger fills in defaults.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    #[serde(default)]
    pub id: Option<ExpenseId>,
    #[serde(default)]
    pub title: String,
    pub amount: Decimal,
    pub category: Category,
    #[serde(default)]
    pub paid_by: Option<ParticipantId>,
    #[serde(flatten)]
    pub split: Split,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExpenseDraft {
    pub fn new(amount: Decimal, category: Category, split: Split) -> Self {
        Self {
            id: None,
            title: String::new(),
            amount,
            category,
            paid_by: None,
            split,
            created_at: None,
        }
    }

    pub fn paid_by(mut self, participant: impl Into<ParticipantId>) -> Self {
        self.paid_by = Some(participant.into());
        self
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<ExpenseId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<Expense> for ExpenseDraft {
    fn from(expense: Expense) -> Self {
        Self {
            id: Some(expense.id),
            title: expense.title,
            amount: expense.amount,
            category: expense.category,
            paid_by: Some(expense.paid_by),
            split: expense.split,
            created_at: Some(expense.created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Currency {
    pub code: String,
    /// Number of fractional digits of the minor unit.
    pub scale: u32,
}

impl Currency {
    pub fn new(code: impl Into<String>, scale: u32) -> Self {
        Self {
            code: code.into(),
            scale,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::new("USD", 2)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Budget {
    pub total: Decimal,
    #[serde(default)]
    pub categories: BTreeMap<Category, Decimal>,
}

/// Everything persisted for one trip.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LedgerState {
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub budget: Budget,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn custom_categories_survive_serialization() {
        let category: Category = serde_json::from_value(json!("souvenirs")).unwrap();
        assert_eq!(category, Category::Custom("souvenirs".to_owned()));
        assert_eq!(serde_json::to_value(&category).unwrap(), json!("souvenirs"));

        let food: Category = serde_json::from_value(json!("food")).unwrap();
        assert_eq!(food, Category::Food);
    }

    #[test]
    fn draft_reads_client_shape() {
        let draft: ExpenseDraft = serde_json::from_value(json!({
            "title": "Dinner",
            "amount": "90.00",
            "category": "food",
            "paidBy": "main_user",
            "splitType": "custom",
            "splitAmounts": { "main_user": "30", "ana": "60" }
        }))
        .unwrap();

        assert_eq!(draft.paid_by.as_deref(), Some("main_user"));
        assert_eq!(
            draft.split,
            Split::custom([("main_user", dec!(30)), ("ana", dec!(60))])
        );
    }

    #[test]
    fn unshared_split_has_no_beneficiaries() {
        let draft: ExpenseDraft = serde_json::from_value(json!({
            "amount": 12,
            "category": "other",
            "splitType": "none"
        }))
        .unwrap();

        assert_eq!(draft.split, Split::None);
        assert!(!draft.split.is_shared());
        assert_eq!(draft.split.beneficiaries().count(), 0);
    }
}
