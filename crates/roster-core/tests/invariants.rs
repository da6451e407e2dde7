//! Property tests: list, flag and view invariants hold after any sequence
//! of inbound events and follow-up completions, in any interleaving.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use roster_core::protocol::{ConnectionEvent, ServerMessage};
use roster_core::{
    FriendEdge, Followup, IgnoreAction, Inbound, PresenceEntry, RelationshipChange,
    RelationshipKind, RosterState, Status,
};

const OWN: &str = "Alice";
const NAMES: [&str; 6] = ["Alice", "Bob", "Carol", "Dave", "Eve", "Mallory"];

#[derive(Debug, Clone)]
enum Step {
    Event(Inbound),
    /// Complete the pending follow-up at this index (mod len) with a fetch
    /// result built from these names
    Complete(usize, Vec<String>),
}

fn arb_name() -> impl Strategy<Value = String> {
    (0..NAMES.len(), any::<bool>()).prop_map(|(i, upper)| {
        if upper {
            NAMES[i].to_uppercase()
        } else {
            NAMES[i].to_string()
        }
    })
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Offline),
        Just(Status::Online),
        Just(Status::Away),
        Just(Status::Busy),
        Just(Status::Looking),
        Just(Status::Dnd),
        Just(Status::Idle),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), Just("hi".to_string()), Just("a &amp; b".to_string())]
}

fn arb_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_name(), 0..4)
}

fn arb_relationship() -> impl Strategy<Value = RelationshipKind> {
    prop_oneof![
        Just(RelationshipKind::FriendAdd),
        Just(RelationshipKind::FriendRemove),
        Just(RelationshipKind::BookmarkAdd),
        Just(RelationshipKind::BookmarkRemove),
    ]
}

fn arb_message() -> impl Strategy<Value = ServerMessage> {
    prop_oneof![
        (arb_name(), arb_status(), arb_text()).prop_map(|(character, status, statusmsg)| {
            ServerMessage::StatusUpdate {
                character,
                status,
                statusmsg,
            }
        }),
        (arb_name(), arb_status()).prop_map(|(identity, status)| ServerMessage::Online {
            identity,
            gender: Default::default(),
            status,
        }),
        arb_name().prop_map(|character| ServerMessage::Offline { character }),
        prop::collection::vec((arb_name(), arb_status(), arb_text()), 0..4).prop_map(|entries| {
            ServerMessage::PresenceBatch {
                characters: entries
                    .into_iter()
                    .map(|(name, status, text)| PresenceEntry(name, Default::default(), status, text))
                    .collect(),
            }
        }),
        (arb_relationship(), arb_name())
            .prop_map(|(kind, name)| ServerMessage::Relationship(RelationshipChange { kind, name })),
        arb_names().prop_map(|characters| ServerMessage::Ignore(IgnoreAction::Init { characters })),
        arb_name().prop_map(|character| ServerMessage::Ignore(IgnoreAction::Add { character })),
        arb_name().prop_map(|character| ServerMessage::Ignore(IgnoreAction::Delete { character })),
        arb_names().prop_map(|ops| ServerMessage::OpList { ops }),
        arb_name().prop_map(|character| ServerMessage::OpAdd { character }),
        arb_name().prop_map(|character| ServerMessage::OpRemove { character }),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => arb_message().prop_map(|m| Step::Event(m.into())),
        1 => any::<bool>().prop_map(|is_reconnect| {
            Step::Event(ConnectionEvent::Connecting { is_reconnect }.into())
        }),
        1 => any::<bool>().prop_map(|is_reconnect| {
            Step::Event(ConnectionEvent::Connected { is_reconnect }.into())
        }),
        3 => (any::<usize>(), arb_names()).prop_map(|(i, names)| Step::Complete(i, names)),
    ]
}

fn edges(names: &[String]) -> Vec<FriendEdge> {
    let last_online = Utc.timestamp_opt(0, 0).unwrap();
    names
        .iter()
        .flat_map(|dest| {
            [OWN, "Zed"].map(|source| FriendEdge {
                source: source.to_string(),
                dest: dest.clone(),
                last_online,
            })
        })
        .collect()
}

fn complete(state: &mut RosterState, followup: Followup, names: Vec<String>) {
    match followup {
        Followup::Resync { epoch } => {
            state.finish_resync(epoch, names.clone(), &edges(&names));
        }
        Followup::ReplayStatus(_) => {}
        Followup::RefreshCharacterFriends { epoch, seq } => {
            state.apply_character_friend_edges(epoch, seq, None, &edges(&names));
        }
        Followup::ConfirmIdentity { epoch, seq, own } => {
            state.apply_character_friend_edges(epoch, seq, Some(&own), &edges(&names));
        }
    }
}

fn run(steps: Vec<Step>) -> Result<(), TestCaseError> {
    let mut state = RosterState::new();
    let mut pending: Vec<Followup> = Vec::new();
    let mut last_version = 0;

    for step in steps {
        match step {
            Step::Event(inbound) => {
                if let Some(followup) = state.apply(inbound, OWN) {
                    pending.push(followup);
                }
            }
            Step::Complete(index, names) => {
                if !pending.is_empty() {
                    let followup = pending.remove(index % pending.len());
                    complete(&mut state, followup, names);
                }
            }
        }

        if let Err(violation) = state.check_consistency() {
            return Err(TestCaseError::fail(violation));
        }
        let (version, _) = state.take_changes();
        prop_assert!(version >= last_version);
        last_version = version;
    }
    Ok(())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn invariants_hold_for_any_sequence(steps in prop::collection::vec(arb_step(), 0..60)) {
        run(steps)?;
    }

    #[test]
    fn offline_characters_are_never_in_views(steps in prop::collection::vec(arb_step(), 0..60)) {
        let mut state = RosterState::new();
        for step in steps {
            if let Step::Event(inbound) = step {
                if let Some(Followup::Resync { epoch }) = state.apply(inbound, OWN) {
                    state.finish_resync(epoch, vec!["Bob".to_string()], &edges(&["Carol".to_string()]));
                }
            }
            for c in state.friends().into_iter().chain(state.bookmarks()).chain(state.character_friends()) {
                prop_assert!(c.is_online(), "{} is offline but listed", c.name);
            }
        }
    }

    #[test]
    fn ignore_list_stays_normalized(actions in prop::collection::vec(
        prop_oneof![
            arb_names().prop_map(|characters| IgnoreAction::Init { characters }),
            arb_name().prop_map(|character| IgnoreAction::Add { character }),
            arb_name().prop_map(|character| IgnoreAction::Delete { character }),
        ],
        0..30,
    )) {
        let mut state = RosterState::new();
        for action in actions {
            state.apply_ignore(action);
            let list = state.ignore_list();
            prop_assert!(list.iter().all(|n| *n == n.to_lowercase()));
            let mut sorted = list.to_vec();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), list.len());
        }
    }
}
