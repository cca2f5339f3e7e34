//! The scripted demo: rendezvous gate, trigger watcher and the six-step
//! task sequence.
//!
//! # Design
//! Two units of execution share exactly one `Gate`: the watcher sets it on
//! the trigger character, the worker clears it and blocks before each step.
//! The wait has no timeout — an absent trigger parks the worker forever,
//! which is the intended behavior for an interactively driven demo. A
//! failed call within a step is logged and the script carries on to wait
//! for the next trigger; nothing here is transactional.

use std::io::{self, Read};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::RestClient;
use crate::json::{extract_max_id, print_records};
use crate::transport::HttpTransport;
use crate::types::CustomerPayload;

/// The character that advances the script.
pub const TRIGGER_BYTE: u8 = b'\n';

/// Pause between polls of an idle trigger source.
const IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// A repeatedly-cleared rendezvous flag shared between the watcher and the
/// worker. No data travels with it.
pub struct Gate {
    flag: Mutex<bool>,
    signal: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    pub fn set(&self) {
        let mut flag = self.flag.lock().unwrap_or_else(PoisonError::into_inner);
        *flag = true;
        self.signal.notify_all();
    }

    pub fn clear(&self) {
        let mut flag = self.flag.lock().unwrap_or_else(PoisonError::into_inner);
        *flag = false;
    }

    pub fn is_set(&self) -> bool {
        *self.flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until another thread calls `set`. Returns immediately when the
    /// flag is already up. No timeout.
    pub fn wait(&self) {
        let mut flag = self.flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*flag {
            flag = self.signal.wait(flag).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Watch a byte stream for the trigger character, setting the gate each
/// time it appears. A read of zero bytes is the idle case and backs off
/// briefly; every byte other than the trigger is ignored. Returns when the
/// source reports an error.
pub fn watch_triggers<R: Read>(mut source: R, gate: &Gate, trigger: u8) {
    let mut byte = [0u8; 1];
    loop {
        match source.read(&mut byte) {
            Ok(0) => thread::sleep(IDLE_BACKOFF),
            Ok(_) if byte[0] == trigger => {
                debug!("trigger received");
                gate.set();
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(IDLE_BACKOFF),
            Err(e) => {
                warn!(error = %e, "trigger source closed");
                return;
            }
        }
    }
}

/// Collection path on the record store.
pub const COLLECTION_PATH: &str = "customers/";

/// Query suffix asking the server for the highest id: one row, sorted by
/// id, descending.
const MAX_ID_QUERY: &str = "?limit=1&by=id&order=desc";

/// Runs the six scripted CRUD steps, each gated on the rendezvous flag.
pub struct Orchestrator<T: HttpTransport> {
    client: RestClient<T>,
    gate: Arc<Gate>,
}

impl<T: HttpTransport> Orchestrator<T> {
    pub fn new(client: RestClient<T>, gate: Arc<Gate>) -> Self {
        Self { client, gate }
    }

    /// Execute the script. Strictly sequential: a step's composed calls run
    /// in order, and step N+1 starts only after the next trigger.
    pub fn run(&mut self) {
        self.await_trigger("read all records");
        self.get_and_print(COLLECTION_PATH);

        self.await_trigger("read record 3");
        self.get_and_print("customers/3");

        self.await_trigger("read records with gender 2");
        self.get_and_print("customers/gender/2");

        self.await_trigger("create a record");
        let new_id = self.create_record();

        self.await_trigger("update the new record");
        match new_id {
            Some(id) => self.update_record(id),
            None => warn!("no record to update"),
        }

        self.await_trigger("delete the new record");
        match new_id {
            Some(id) => self.delete_record(id),
            None => warn!("no record to delete"),
        }

        info!("all steps finished");
    }

    fn await_trigger(&self, prompt: &str) {
        self.gate.clear();
        info!("");
        info!("press Enter to {prompt}");
        self.gate.wait();
    }

    /// Step 4: POST, then confirm by looking up the id the server assigned.
    fn create_record(&mut self) -> Option<i64> {
        let body = match CustomerPayload::new("Tom", 1).to_json() {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "could not serialize the create payload");
                return None;
            }
        };
        if !self.client.post(COLLECTION_PATH, &body).ok {
            warn!("create failed");
            return None;
        }
        match self.fetch_max_id() {
            Some(id) => {
                info!(id, "created record");
                self.get_and_print(&format!("customers/{id}"));
                Some(id)
            }
            None => {
                warn!("create did not produce a retrievable id");
                None
            }
        }
    }

    /// Step 5: PUT only after the record was seen, then re-read it.
    fn update_record(&mut self, id: i64) {
        let path = format!("customers/{id}");
        if !self.get_and_print(&path) {
            return;
        }
        match CustomerPayload::new("Petty", 2).to_json() {
            Ok(body) => {
                if !self.client.put(&path, &body).ok {
                    warn!(id, "update failed");
                }
                self.get_and_print(&path);
            }
            Err(err) => warn!(error = %err, "could not serialize the update payload"),
        }
    }

    /// Step 6: DELETE only after the record was seen, then list again. The
    /// final listing hits the collection without its trailing slash.
    fn delete_record(&mut self, id: i64) {
        let path = format!("customers/{id}");
        if !self.get_and_print(&path) {
            return;
        }
        if !self.client.delete(&path).ok {
            warn!(id, "delete failed");
        }
        self.get_and_print("customers");
    }

    /// GET a path and print whatever records came back. Returns whether the
    /// request itself succeeded.
    fn get_and_print(&mut self, path: &str) -> bool {
        let result = self.client.get(path);
        if result.ok {
            match serde_json::from_slice::<Value>(&result.body) {
                Ok(root) => print_records(&root),
                Err(err) => warn!(error = %err, "response was not valid JSON"),
            }
        }
        result.ok
    }

    fn fetch_max_id(&mut self) -> Option<i64> {
        let result = self.client.get(&format!("{COLLECTION_PATH}{MAX_ID_QUERY}"));
        if !result.ok {
            return None;
        }
        let root: Value = serde_json::from_slice(&result.body).ok()?;
        extract_max_id(&root)
    }
}
