use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{
    ActivityType, Author, Contact, ContactFieldType, ConversationId, DebtDirection, FrequencyType,
    Gender, GiftStatus, RelationshipType, TaskId,
};
use crate::errors::DispatchError;
use crate::operations::{
    AddMessageToConversation, ArgValue, BoundArgs, Counterparty, CreateTaskFor, FindPeople, LogActivityWith,
    LogCallWith, LogGift, LogJobForPerson, MarkTaskAsComplete, Operation, PersonTarget,
    RememberPerson, RememberSomethingAbout, SetRelationship, SetReminderFor,
    StartConversationWith, TagPerson, TrackDebt, UntagPerson,
};

const ME: &str = "me";

impl Operation {
    /// Builds the typed invocation from arguments that have already been
    /// resolved and validated against the operation's schema.
    pub fn bind(name: &str, mut args: BoundArgs) -> Result<Self, DispatchError> {
        let args = &mut args;
        let operation = match name {
            "remember_person" => Self::RememberPerson(RememberPerson {
                first_name: required(args, "first_name", text)?,
                last_name: optional(args, "last_name", text)?,
                nickname: optional(args, "nickname", text)?,
                gender: required(args, "gender", gender)?,
            }),
            "find_people" => Self::FindPeople(FindPeople { query: required(args, "query", text)? }),
            "get_details_about_person" => Self::GetDetailsAboutPerson(target(args)?),
            "forget_person" => Self::ForgetPerson(target(args)?),
            "remember_something_about" => Self::RememberSomethingAbout(RememberSomethingAbout {
                person: required(args, "person_name", contact)?,
                memory_text: required(args, "memory_text", text)?,
                is_important: required(args, "is_important", flag)?,
            }),
            "get_memories_about" => Self::GetMemoriesAbout(target(args)?),
            "log_activity_with" => Self::LogActivityWith(LogActivityWith {
                people: required(args, "people_names", contacts)?,
                summary: required(args, "summary", text)?,
                activity_type: required(args, "activity_type", activity_type)?,
                date: required(args, "date", date)?,
                description: optional(args, "description", text)?,
            }),
            "log_call_with" => Self::LogCallWith(LogCallWith {
                person: required(args, "person_name", contact)?,
                date: required(args, "date", date)?,
                description: required(args, "description", text)?,
            }),
            "start_conversation_with" => Self::StartConversationWith(StartConversationWith {
                person: required(args, "person_name", contact)?,
                date: required(args, "date", date)?,
                medium: required(args, "medium", medium)?,
            }),
            "add_message_to_conversation" => {
                let written_by = required(args, "written_by", choice)?;
                Self::AddMessageToConversation(AddMessageToConversation {
                    conversation_id: ConversationId(required(args, "conversation_id", int)?),
                    content: required(args, "content", text)?,
                    written_by: Author::parse(&written_by).ok_or_else(|| unbound("written_by"))?,
                    date: required(args, "date", date)?,
                })
            }
            "set_relationship" => Self::SetRelationship(SetRelationship {
                person1: required(args, "person1_name", contact)?,
                relationship_type: required(args, "relationship_name", relationship_type)?,
                person2: required(args, "person2_name", contact)?,
            }),
            "create_task_for" => Self::CreateTaskFor(CreateTaskFor {
                person: required(args, "person_name", contact)?,
                title: required(args, "title", text)?,
                description: optional(args, "description", text)?,
            }),
            "mark_task_as_complete" => Self::MarkTaskAsComplete(MarkTaskAsComplete {
                task_id: TaskId(required(args, "task_id", int)?),
            }),
            "set_reminder_for" => {
                let frequency_type = required(args, "frequency_type", choice)?;
                let frequency_number = required(args, "frequency_number", int)?;
                if frequency_number < 1 {
                    return Err(DispatchError::validation("frequency_number", "must be at least 1"));
                }
                Self::SetReminderFor(SetReminderFor {
                    person: required(args, "person_name", contact)?,
                    title: required(args, "title", text)?,
                    date: required(args, "date", date)?,
                    frequency_type: FrequencyType::parse(&frequency_type)
                        .ok_or_else(|| unbound("frequency_type"))?,
                    frequency_number,
                })
            }
            "track_debt" => Self::TrackDebt(bind_debt(args)?),
            "log_gift" => {
                let status = required(args, "status", choice)?;
                Self::LogGift(LogGift {
                    person: required(args, "person_name", contact)?,
                    gift_name: required(args, "gift_name", text)?,
                    status: GiftStatus::parse(&status).ok_or_else(|| unbound("status"))?,
                    date: optional(args, "date", date)?,
                    amount: optional(args, "amount", number)?,
                })
            }
            "log_job_for_person" => Self::LogJobForPerson(LogJobForPerson {
                person: required(args, "person_name", contact)?,
                job_title: required(args, "job_title", text)?,
                company_name: required(args, "company_name", text)?,
                start_date: optional(args, "start_date", date)?,
            }),
            "tag_person" => Self::TagPerson(TagPerson {
                person: required(args, "person_name", contact)?,
                tags: required(args, "tags", list)?,
            }),
            "untag_person" => Self::UntagPerson(UntagPerson {
                person: required(args, "person_name", contact)?,
                tags_to_remove: required(args, "tags_to_remove", list)?,
            }),
            other => return Err(DispatchError::UnknownOperation(other.to_string())),
        };
        Ok(operation)
    }
}

/// Exactly one side of a debt is the user.
fn bind_debt(args: &mut BoundArgs) -> Result<TrackDebt, DispatchError> {
    let owes = required(args, "person_who_owes_money", text)?;
    let owed = required(args, "person_who_is_owed_money", text)?;
    // Debts are recorded in whole currency units.
    let amount = required(args, "amount", number)?.trunc();
    let reason = optional(args, "reason", text)?;
    let is_settled = required(args, "is_settled", flag)?;

    let (direction, counterparty) = match (is_me(&owes), is_me(&owed)) {
        (true, true) => {
            return Err(DispatchError::validation(
                "person_who_owes_money",
                "Cannot create a debt where you owe money to yourself.",
            ))
        }
        (false, false) => {
            return Err(DispatchError::validation(
                "person_who_owes_money",
                "One of the parties in the debt must be 'me'. This tool tracks your debts, not debts between two other people.",
            ))
        }
        (true, false) => (DebtDirection::UserOwesContact, owed),
        (false, true) => (DebtDirection::ContactOwesUser, owes),
    };

    if amount <= Decimal::ZERO {
        return Err(DispatchError::validation(
            "amount",
            "must be at least one whole currency unit",
        ));
    }

    Ok(TrackDebt {
        counterparty: Counterparty::Named(counterparty),
        direction,
        amount,
        reason,
        is_settled,
    })
}

fn is_me(party: &str) -> bool {
    party.trim().eq_ignore_ascii_case(ME)
}

fn target(args: &mut BoundArgs) -> Result<PersonTarget, DispatchError> {
    Ok(PersonTarget { person: required(args, "person_name", contact)? })
}

fn unbound(name: &str) -> DispatchError {
    DispatchError::Defect(format!("argument `{name}` was not bound to the expected type"))
}

fn required<T>(
    args: &mut BoundArgs,
    name: &'static str,
    pick: fn(ArgValue) -> Option<T>,
) -> Result<T, DispatchError> {
    args.take(name).and_then(pick).ok_or_else(|| unbound(name))
}

fn optional<T>(
    args: &mut BoundArgs,
    name: &'static str,
    pick: fn(ArgValue) -> Option<T>,
) -> Result<Option<T>, DispatchError> {
    match args.take(name) {
        None => Ok(None),
        Some(value) => pick(value).map(Some).ok_or_else(|| unbound(name)),
    }
}

fn text(value: ArgValue) -> Option<String> {
    match value {
        ArgValue::Text(text) => Some(text),
        _ => None,
    }
}

fn int(value: ArgValue) -> Option<i64> {
    match value {
        ArgValue::Int(number) => Some(number),
        _ => None,
    }
}

fn number(value: ArgValue) -> Option<Decimal> {
    match value {
        ArgValue::Number(number) => Some(number),
        _ => None,
    }
}

fn flag(value: ArgValue) -> Option<bool> {
    match value {
        ArgValue::Bool(flag) => Some(flag),
        _ => None,
    }
}

fn date(value: ArgValue) -> Option<NaiveDate> {
    match value {
        ArgValue::Date(date) => Some(date),
        _ => None,
    }
}

fn choice(value: ArgValue) -> Option<String> {
    match value {
        ArgValue::Choice(choice) => Some(choice),
        _ => None,
    }
}

fn list(value: ArgValue) -> Option<Vec<String>> {
    match value {
        ArgValue::TextList(items) => Some(items),
        _ => None,
    }
}

fn contact(value: ArgValue) -> Option<Contact> {
    match value {
        ArgValue::Contact(contact) => Some(contact),
        _ => None,
    }
}

fn contacts(value: ArgValue) -> Option<Vec<Contact>> {
    match value {
        ArgValue::Contacts(contacts) => Some(contacts),
        _ => None,
    }
}

fn gender(value: ArgValue) -> Option<Gender> {
    match value {
        ArgValue::Gender(gender) => Some(gender),
        _ => None,
    }
}

fn relationship_type(value: ArgValue) -> Option<RelationshipType> {
    match value {
        ArgValue::RelationshipType(kind) => Some(kind),
        _ => None,
    }
}

fn medium(value: ArgValue) -> Option<ContactFieldType> {
    match value {
        ArgValue::Medium(medium) => Some(medium),
        _ => None,
    }
}

fn activity_type(value: ArgValue) -> Option<ActivityType> {
    match value {
        ArgValue::ActivityType(kind) => Some(kind),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::DebtDirection;
    use crate::errors::{DispatchError, ErrorKind};
    use crate::operations::{ArgValue, BoundArgs, Counterparty, Operation};

    fn debt_args(owes: &str, owed: &str, amount: i64) -> BoundArgs {
        let mut args = BoundArgs::default();
        args.insert("person_who_owes_money", ArgValue::Text(owes.to_string()));
        args.insert("person_who_is_owed_money", ArgValue::Text(owed.to_string()));
        args.insert("amount", ArgValue::Number(Decimal::from(amount)));
        args.insert("is_settled", ArgValue::Bool(false));
        args
    }

    #[test]
    fn debt_with_me_on_both_sides_is_rejected() {
        let error = Operation::bind("track_debt", debt_args("me", "ME", 50)).expect_err("self debt");

        assert_eq!(error.kind(), ErrorKind::ValidationError);
        assert!(error.to_string().contains("owe money to yourself"));
    }

    #[test]
    fn debt_between_two_other_people_is_rejected_with_its_own_message() {
        let both = Operation::bind("track_debt", debt_args("me", "me", 50)).expect_err("self");
        let neither =
            Operation::bind("track_debt", debt_args("Alice", "Bob", 50)).expect_err("third party");

        assert_eq!(neither.kind(), ErrorKind::ValidationError);
        assert!(neither.to_string().contains("must be 'me'"));
        assert_ne!(both.to_string(), neither.to_string());
    }

    #[test]
    fn user_owing_sets_direction_and_counterparty() {
        let operation = Operation::bind("track_debt", debt_args("me", "Jane", 50)).expect("bound");

        match operation {
            Operation::TrackDebt(debt) => {
                assert_eq!(debt.direction, DebtDirection::UserOwesContact);
                assert_eq!(debt.counterparty, Counterparty::Named("Jane".to_string()));
            }
            other => panic!("unexpected operation {other:?}"),
        }
    }

    #[test]
    fn fractional_amount_below_one_unit_is_rejected() {
        let mut args = debt_args("me", "Jane", 0);
        args.insert("amount", ArgValue::Number(Decimal::new(5, 1)));

        let error = Operation::bind("track_debt", args).expect_err("below one unit");

        assert_eq!(error.kind(), ErrorKind::ValidationError);
        assert_eq!(
            error.to_string(),
            "Invalid argument 'amount': must be at least one whole currency unit"
        );
    }

    #[test]
    fn amount_is_truncated_before_binding() {
        let mut args = debt_args("me", "Jane", 0);
        args.insert("amount", ArgValue::Number(Decimal::new(4299, 2)));

        match Operation::bind("track_debt", args).expect("bound") {
            Operation::TrackDebt(debt) => assert_eq!(debt.amount, Decimal::from(42)),
            other => panic!("unexpected operation {other:?}"),
        }
    }

    #[test]
    fn missing_bound_argument_is_a_defect_not_a_validation_error() {
        let error = Operation::bind("find_people", BoundArgs::default()).expect_err("unbound");

        assert!(matches!(error, DispatchError::Defect(_)));
    }
}
