//! Recorded histories of operations on a shared object.
use std::collections::HashMap;
use std::ops::Index;

/// Identifier of an entry within a history.
pub type EntryId = usize;

/// One observed action: the invocation of an operation or its completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action<T> {
    Call(T),
    Response(T),
}

/// The invocation of an operation, linked to its response entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallEntry<T> {
    pub id: EntryId,
    pub operation: T,
    pub response: EntryId,
}

/// The completion of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseEntry<T> {
    pub id: EntryId,
    pub operation: T,
}

/// An entry of a [`History`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry<T> {
    Call(CallEntry<T>),
    Response(ResponseEntry<T>),
}

impl<T> Entry<T> {
    pub fn id(&self) -> EntryId {
        match self {
            Entry::Call(entry) => entry.id,
            Entry::Response(entry) => entry.id,
        }
    }
}

/// A complete history of call and response actions.
///
/// Entries keep their identity while a checker temporarily removes
/// call/response pairs with [`lift`](History::lift) and restores them with
/// [`unlift`](History::unlift).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct History<T> {
    entries: Vec<Entry<T>>,
    // Index each removed entry was lifted from, so unlift can restore it.
    removed_from: Vec<Option<usize>>,
}

impl<T> History<T> {
    /// Builds a history from `(process, action)` pairs in the order the
    /// actions were observed.
    ///
    /// # Panics
    ///
    /// Panics if a process responds without a pending call, calls again
    /// before responding, or leaves a call without a response.
    pub fn from_actions(actions: Vec<(usize, Action<T>)>) -> Self {
        let mut entries: Vec<Entry<T>> = Vec::with_capacity(actions.len());
        let mut pending: HashMap<usize, EntryId> = HashMap::new();

        for (id, (process, action)) in actions.into_iter().enumerate() {
            match action {
                Action::Call(operation) => {
                    let previous = pending.insert(process, id);
                    assert!(
                        previous.is_none(),
                        "process {process} called again before responding"
                    );
                    entries.push(Entry::Call(CallEntry {
                        id,
                        operation,
                        response: id,
                    }));
                }
                Action::Response(operation) => {
                    let call = pending
                        .remove(&process)
                        .unwrap_or_else(|| panic!("process {process} responded without a call"));
                    match &mut entries[call] {
                        Entry::Call(call) => call.response = id,
                        Entry::Response(_) => unreachable!("pending entry is always a call"),
                    }
                    entries.push(Entry::Response(ResponseEntry { id, operation }));
                }
            }
        }
        assert!(
            pending.is_empty(),
            "history is incomplete: {} unanswered calls",
            pending.len()
        );

        let removed_from = vec![None; entries.len()];
        Self {
            entries,
            removed_from,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<T>> {
        self.entries.iter()
    }

    /// Returns the current index of the entry with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the entry has been removed from the history.
    pub fn index_of_id(&self, id: EntryId) -> usize {
        self.iter()
            .position(|entry| entry.id() == id)
            .unwrap_or_else(|| panic!("entry {id} is not in the history"))
    }

    /// Removes the call entry at `index` together with its response, and
    /// returns both.
    ///
    /// # Panics
    ///
    /// Panics if the entry at `index` is a response.
    pub fn lift(&mut self, index: usize) -> (Entry<T>, Entry<T>) {
        match self.remove(index) {
            Entry::Response(_) => panic!("cannot lift a response entry"),
            Entry::Call(call) => {
                let response = self.remove(self.index_of_id(call.response));
                (Entry::Call(call), response)
            }
        }
    }

    /// Restores a call/response pair removed by [`lift`](History::lift) and
    /// returns the indices they were restored to.
    pub fn unlift(&mut self, call: Entry<T>, response: Entry<T>) -> (usize, usize) {
        let response_index = self.insert(response);
        let call_index = self.insert(call);
        (call_index, response_index)
    }

    fn remove(&mut self, index: usize) -> Entry<T> {
        let entry = self.entries.remove(index);
        self.removed_from[entry.id()] = Some(index);
        entry
    }

    fn insert(&mut self, entry: Entry<T>) -> usize {
        match self.removed_from[entry.id()].take() {
            Some(index) => {
                self.entries.insert(index, entry);
                index
            }
            None => panic!("entry {} was not removed from the history", entry.id()),
        }
    }
}

impl<T> Index<usize> for History<T> {
    type Output = Entry<T>;

    fn index(&self, index: usize) -> &Self::Output {
        self.entries.index(index)
    }
}
