//! Room membership table.
//!
//! A room exists only while it has members: the entry is created on first join
//! and removed the moment its last member leaves.

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use crate::domain::{ClientId, RoomName};

use super::client::Client;

#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomName, HashMap<ClientId, Arc<Client>>>,
}

impl RoomTable {
    /// Returns `false` when the client was already a member.
    pub fn join(&mut self, room: RoomName, client: Arc<Client>) -> bool {
        let members = self.rooms.entry(room).or_default();
        match members.entry(client.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(client);
                true
            }
        }
    }

    /// Returns `false` when the client was not a member.
    pub fn leave(&mut self, room: &RoomName, client_id: &ClientId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(client_id).is_some();
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }

    /// Remove the client from every room; returns the rooms it left.
    pub fn remove_client(&mut self, client_id: &ClientId) -> Vec<RoomName> {
        let mut left = Vec::new();
        self.rooms.retain(|room, members| {
            if members.remove(client_id).is_some() {
                left.push(room.clone());
            }
            !members.is_empty()
        });
        left
    }

    pub fn members(&self, room: &RoomName) -> impl Iterator<Item = &Arc<Client>> {
        self.rooms.get(room).into_iter().flat_map(|m| m.values())
    }

    pub fn contains_room(&self, room: &RoomName) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
