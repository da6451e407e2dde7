//! Connection lifecycle: connecting, resync, connected
//!
//! Every `connecting` opens a new session epoch. Presence from the old
//! session is discarded immediately, and any follow-up issued before it
//! resolves into a no-op when it finally completes.

use crate::character::Status;
use crate::events::RosterList;
use crate::lists::{contains_name, insert_name};
use crate::protocol::{FriendEdge, StatusCommand};
use crate::state::{Followup, RosterState};

impl RosterState {
    /// Start a connection attempt.
    ///
    /// On a reconnect our own last status is captured for replay once the
    /// server accepts the connection. Everyone is forced offline, the
    /// presence views and the character-friend list are emptied, and the
    /// returned follow-up refetches bookmarks and friends.
    pub fn begin_connecting(&mut self, is_reconnect: bool) -> Followup {
        self.epoch += 1;
        tracing::info!(
            "Connecting (session {}, reconnect: {})",
            self.epoch,
            is_reconnect
        );

        if is_reconnect {
            // A second attempt after a failed one finds us already offline;
            // keep what the first attempt captured.
            if let Some(own) = self.own_character().filter(|c| c.is_online()) {
                self.reconnect_status = Some(StatusCommand {
                    status: own.status,
                    statusmsg: own.status_text.clone(),
                });
            }
        } else {
            self.reconnect_status = None;
        }

        self.reset_presence();
        if !self.lists.character_friends.is_empty() {
            self.lists.character_friends.clear();
            self.record_list(RosterList::CharacterFriendList);
        }
        self.reconcile_character_friends();

        Followup::Resync { epoch: self.epoch }
    }

    /// Apply the bookmark and friend lists fetched for session `epoch`.
    ///
    /// Every known character's `is_friend` and `is_bookmarked` are reset
    /// from the fresh lists. Presence that arrived while the fetch was in
    /// flight is kept and the online views are re-derived against it.
    /// Returns false when a newer session has started.
    pub fn finish_resync(&mut self, epoch: u64, bookmarks: Vec<String>, edges: &[FriendEdge]) -> bool {
        if epoch != self.epoch {
            tracing::warn!(
                "Discarding resync for session {} (now {})",
                epoch,
                self.epoch
            );
            return false;
        }

        let mut bookmark_list = Vec::new();
        for name in &bookmarks {
            insert_name(&mut bookmark_list, name);
        }
        let mut friend_list = Vec::new();
        for edge in edges {
            insert_name(&mut friend_list, &edge.dest);
        }

        if bookmark_list != self.lists.bookmarks {
            self.lists.bookmarks = bookmark_list;
            self.record_list(RosterList::BookmarkList);
        }
        if friend_list != self.lists.friends {
            self.lists.friends = friend_list;
            self.record_list(RosterList::FriendList);
        }

        let mut changed = Vec::new();
        for (_, c) in self.registry.iter_mut() {
            let friend = contains_name(&self.lists.friends, &c.name);
            let bookmarked = contains_name(&self.lists.bookmarks, &c.name);
            if c.is_friend != friend || c.is_bookmarked != bookmarked {
                c.is_friend = friend;
                c.is_bookmarked = bookmarked;
                changed.push(c.name.clone());
            }
        }
        for name in changed {
            self.record_character(&name);
        }

        self.reconcile_presence_views();
        self.reconcile_character_friends();
        tracing::info!(
            "Resynced {} friends and {} bookmarks",
            self.lists.friends.len(),
            self.lists.bookmarks.len()
        );
        true
    }

    /// The server accepted the connection.
    ///
    /// After a reconnect the ignore and op flags are re-derived and the
    /// captured status, if any, is handed back for replay exactly once.
    pub fn on_connected(&mut self, is_reconnect: bool) -> Option<Followup> {
        tracing::info!("Connected (session {})", self.epoch);
        if !is_reconnect {
            return None;
        }
        self.rederive_moderation_flags();
        self.reconnect_status
            .take()
            .filter(|command| command.status != Status::Offline)
            .map(Followup::ReplayStatus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Gender;
    use chrono::Utc;

    fn edge(source: &str, dest: &str) -> FriendEdge {
        FriendEdge {
            source: source.to_string(),
            dest: dest.to_string(),
            last_online: Utc::now(),
        }
    }

    fn connected_as_alice() -> RosterState {
        let mut state = RosterState::new();
        state.character_online("Alice", Gender::Female, Status::Online, "Alice");
        state.status_update("Alice", Status::Looking, "open for RP");
        state
    }

    #[test]
    fn test_connecting_resets_presence_and_opens_epoch() {
        let mut state = connected_as_alice();
        state.lists.friends.push("Bob".to_string());
        state.get("Bob").is_friend = true;
        state.status_update("Bob", Status::Online, "first");
        state.status_update("Bob", Status::Online, "hi");

        let followup = state.begin_connecting(false);
        assert_eq!(followup, Followup::Resync { epoch: 1 });
        assert_eq!(state.epoch(), 1);
        assert!(state.friends().is_empty());
        assert!(state.characters().all(|c| c.status == Status::Offline));
        assert_eq!(state.character("Bob").unwrap().previous_status_text, "first");
        assert!(state.check_consistency().is_ok());
    }

    #[test]
    fn test_reconnect_replays_status_once() {
        let mut state = connected_as_alice();
        let Followup::Resync { epoch } = state.begin_connecting(true) else {
            panic!("Expected resync");
        };
        assert!(state.finish_resync(epoch, vec![], &[]));

        let followup = state.on_connected(true);
        assert_eq!(
            followup,
            Some(Followup::ReplayStatus(StatusCommand {
                status: Status::Looking,
                statusmsg: "open for RP".to_string(),
            }))
        );
        assert_eq!(state.on_connected(true), None);
    }

    #[test]
    fn test_repeated_reconnect_keeps_first_capture() {
        let mut state = connected_as_alice();
        state.begin_connecting(true);
        state.begin_connecting(true);

        let Some(Followup::ReplayStatus(command)) = state.on_connected(true) else {
            panic!("Expected a status replay");
        };
        assert_eq!(command.status, Status::Looking);
    }

    #[test]
    fn test_fresh_connect_does_not_replay() {
        let mut state = connected_as_alice();
        state.begin_connecting(false);
        assert_eq!(state.on_connected(false), None);
        assert_eq!(state.on_connected(true), None);
    }

    #[test]
    fn test_resync_sets_flags_from_fetched_lists() {
        let mut state = RosterState::new();
        state.get("Bob");
        state.get("Carol").is_bookmarked = true;
        state.lists.bookmarks.push("Carol".to_string());

        let Followup::Resync { epoch } = state.begin_connecting(false) else {
            panic!("Expected resync");
        };
        assert!(state.finish_resync(
            epoch,
            vec!["Dave".to_string(), "dave".to_string()],
            &[edge("Alice", "Bob"), edge("Zed", "bob")],
        ));

        assert_eq!(state.friend_list(), ["Bob"]);
        assert_eq!(state.bookmark_list(), ["Dave"]);
        assert!(state.character("bob").unwrap().is_friend);
        assert!(!state.character("carol").unwrap().is_bookmarked);
        assert!(state.check_consistency().is_ok());
    }

    #[test]
    fn test_presence_during_resync_is_kept() {
        let mut state = RosterState::new();
        let Followup::Resync { epoch } = state.begin_connecting(false) else {
            panic!("Expected resync");
        };
        state.status_update("Bob", Status::Online, "");
        assert!(state.friends().is_empty());

        state.finish_resync(epoch, vec![], &[edge("Alice", "Bob")]);
        assert_eq!(state.friends().len(), 1);
        assert!(state.check_consistency().is_ok());
    }

    #[test]
    fn test_stale_resync_is_dropped() {
        let mut state = RosterState::new();
        let Followup::Resync { epoch: first } = state.begin_connecting(false) else {
            panic!("Expected resync");
        };
        state.begin_connecting(true);

        assert!(!state.finish_resync(first, vec!["Bob".to_string()], &[]));
        assert!(state.bookmark_list().is_empty());
    }

    #[test]
    fn test_connected_rederives_moderation_flags() {
        let mut state = RosterState::new();
        state.get("Dave");
        state.lists.ignore.push("dave".to_string());
        assert!(!state.character("Dave").unwrap().is_ignored);

        state.on_connected(true);
        assert!(state.character("Dave").unwrap().is_ignored);
        assert!(state.check_consistency().is_ok());
    }
}
