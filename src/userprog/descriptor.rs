/*
 * File Descriptor Table
 *
 * Per-process mapping from integer descriptor ids to open files.
 * Ids 0-2 are reserved for the console; real entries start at 3. A new
 * descriptor gets (highest existing id) + 1, so ids never regress even
 * after closes, and lookup searches by id equality - positions in the
 * table mean nothing.
 */

use alloc::vec::Vec;

use crate::fs::File;

/// First allocatable descriptor id; 0/1/2 belong to the console.
const FIRST_FD: i32 = 3;

pub struct Descriptor {
    pub id: i32,
    pub file: File,
}

pub struct DescriptorTable {
    entries: Vec<Descriptor>,
}

impl DescriptorTable {
    pub const fn new() -> DescriptorTable {
        DescriptorTable {
            entries: Vec::new(),
        }
    }

    /// Register an open file and return its new descriptor id.
    pub fn alloc(&mut self, file: File) -> i32 {
        let id = self
            .entries
            .iter()
            .map(|d| d.id)
            .max()
            .map_or(FIRST_FD, |max| max + 1);
        self.entries.push(Descriptor { id, file });
        id
    }

    /// Look up a descriptor by id. Console ids and unknown ids are None.
    pub fn get_mut(&mut self, id: i32) -> Option<&mut Descriptor> {
        if id < FIRST_FD {
            return None;
        }
        self.entries.iter_mut().find(|d| d.id == id)
    }

    /// Remove a descriptor, closing its file when the entry drops.
    pub fn remove(&mut self, id: i32) -> Option<Descriptor> {
        let index = self.entries.iter().position(|d| d.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Close every descriptor (process exit).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        DescriptorTable::new()
    }
}
