//! Channel data model: membership, modes, topic, limit, key, masks.
//!
//! Grounded in `original_source/pyircd/channel.py`'s `Channel` class. Per
//! the spec's central-arena design note, a `Channel` stores only opaque
//! user-ids for membership — nick/identifier lookups happen through the
//! registry's user table at the call site, not here. This keeps the
//! cross-object orchestration (broadcast, permission checks against the
//! *setter's* identity) in `crate::registry`, where both tables are
//! visible at once, while this module stays pure data plus small,
//! independently testable predicates.

use std::collections::{HashMap, HashSet};

use crate::types::UserId;

/// Simple (non-parameterized, non-per-user) channel modes.
pub const SIMPLE_MODES: [char; 5] = ['m', 's', 'i', 't', 'n'];
/// Per-user-in-channel modes.
pub const USER_MODES: [char; 2] = ['o', 'v'];

#[derive(Debug)]
pub struct Channel {
    pub name: String,
    /// Join order; the first entry was granted `o` on creation.
    pub users: Vec<UserId>,
    pub usermodes: HashMap<UserId, HashSet<char>>,
    pub modes: HashSet<char>,
    pub topic: Option<String>,
    pub limit: Option<usize>,
    pub key: Option<String>,
    pub ban_masks: Vec<String>,
    pub except_masks: Vec<String>,
}

impl Channel {
    pub fn new(name: String) -> Self {
        Channel {
            name,
            users: Vec::new(),
            usermodes: HashMap::new(),
            modes: HashSet::new(),
            topic: None,
            limit: None,
            key: None,
            ban_masks: Vec::new(),
            except_masks: Vec::new(),
        }
    }

    pub fn is_member(&self, id: UserId) -> bool {
        self.users.contains(&id)
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|l| self.users.len() >= l)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Appends a user to membership. Caller (the registry) is responsible
    /// for the already-present no-op check and the key/limit checks —
    /// this method only performs the mutation, per `spec.md` §4.5.
    pub fn add_member(&mut self, id: UserId) {
        self.users.push(id);
    }

    pub fn remove_member(&mut self, id: UserId) {
        self.users.retain(|u| *u != id);
        self.usermodes.remove(&id);
    }

    pub fn mode_on_user(&self, id: UserId, mode: char) -> bool {
        self.usermodes.get(&id).is_some_and(|s| s.contains(&mode))
    }

    pub fn add_user_mode(&mut self, id: UserId, mode: char) {
        self.usermodes.entry(id).or_default().insert(mode);
    }

    pub fn remove_user_mode(&mut self, id: UserId, mode: char) {
        if let Some(modes) = self.usermodes.get_mut(&id) {
            modes.remove(&mode);
            if modes.is_empty() {
                self.usermodes.remove(&id);
            }
        }
    }

    /// `@` for ops, `+` for voice, empty otherwise — used by NAMES/WHO.
    pub fn mode_prefix(&self, id: UserId) -> &'static str {
        if self.mode_on_user(id, 'o') {
            "@"
        } else if self.mode_on_user(id, 'v') {
            "+"
        } else {
            ""
        }
    }

    pub fn has_mode(&self, mode: char) -> bool {
        if self.modes.contains(&mode) {
            return true;
        }
        match mode {
            'k' => self.key.is_some(),
            'l' => self.limit.is_some(),
            _ => false,
        }
    }

    /// Builds the `RPL_CHANNELMODEIS` mode-letter string and its parameter
    /// list. `l`/`k` values are disclosed only when `discloser_is_op` is
    /// true, per `spec.md` §9 open-question resolution #5.
    pub fn mode_query(&self, discloser_is_op: bool) -> (String, Vec<String>) {
        let mut letters: Vec<char> = self.modes.iter().copied().collect();
        letters.sort_unstable();
        let mut letters: String = letters.into_iter().collect();

        let mut params = Vec::new();
        if self.limit.is_some() {
            letters.push('l');
            if discloser_is_op {
                params.push(self.limit.unwrap().to_string());
            }
        }
        if self.key.is_some() {
            letters.push('k');
            if discloser_is_op {
                params.push(self.key.clone().unwrap());
            }
        }
        (letters, params)
    }

    pub fn add_ban_mask(&mut self, mask: String) {
        if !self.ban_masks.contains(&mask) {
            self.ban_masks.push(mask);
        }
    }

    pub fn remove_ban_mask(&mut self, mask: &str) {
        if let Some(pos) = self.ban_masks.iter().position(|m| m == mask) {
            self.ban_masks.remove(pos);
        }
    }

    pub fn add_except_mask(&mut self, mask: String) {
        if !self.except_masks.contains(&mask) {
            self.except_masks.push(mask);
        }
    }

    pub fn remove_except_mask(&mut self, mask: &str) {
        if let Some(pos) = self.except_masks.iter().position(|m| m == mask) {
            self.except_masks.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_enforced_via_is_full() {
        let mut chan = Channel::new("#small".into());
        chan.limit = Some(1);
        chan.add_member(1);
        assert!(chan.is_full());
    }

    #[test]
    fn add_then_remove_simple_mode_leaves_no_residue() {
        let mut chan = Channel::new("#lobby".into());
        chan.modes.insert('m');
        chan.modes.remove(&'m');
        assert!(chan.modes.is_empty());
    }

    #[test]
    fn user_mode_prefix_prefers_op_over_voice() {
        let mut chan = Channel::new("#lobby".into());
        chan.add_member(1);
        chan.add_user_mode(1, 'o');
        chan.add_user_mode(1, 'v');
        assert_eq!(chan.mode_prefix(1), "@");
    }

    #[test]
    fn removing_last_user_mode_drops_map_entry() {
        let mut chan = Channel::new("#lobby".into());
        chan.add_user_mode(1, 'v');
        chan.remove_user_mode(1, 'v');
        assert!(!chan.usermodes.contains_key(&1));
    }

    #[test]
    fn mode_query_hides_values_from_non_ops() {
        let mut chan = Channel::new("#vault".into());
        chan.key = Some("secret".into());
        chan.limit = Some(5);
        let (letters, params) = chan.mode_query(false);
        assert!(letters.contains('k') && letters.contains('l'));
        assert!(params.is_empty());

        let (letters, params) = chan.mode_query(true);
        assert!(letters.contains('k') && letters.contains('l'));
        assert_eq!(params, vec!["5".to_string(), "secret".to_string()]);
    }
}
