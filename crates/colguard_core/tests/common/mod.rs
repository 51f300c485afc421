#![allow(dead_code)]

use colguard_core::db::query::SelectQuery;
use colguard_core::{Accessor, BoxError, ConnectionHandle, Row, Target, ValidatorError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// What `fetch_one` does when called.
pub enum Reply {
    Row(Option<Row>),
    Fail(&'static str),
    Panic(&'static str),
    NotRegistered(&'static str),
}

/// Handle whose readiness and query replies are scripted per test.
pub struct ScriptedHandle {
    ready: AtomicBool,
    becomes_ready: bool,
    init_error: Option<&'static str>,
    reply: Reply,
    pub init_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub queries: Mutex<Vec<SelectQuery>>,
    pub tables: Mutex<Vec<String>>,
}

impl ScriptedHandle {
    pub fn ready(reply: Reply) -> Self {
        Self::build(true, true, None, reply)
    }

    /// Not ready until `initialize` runs.
    pub fn lazy(reply: Reply) -> Self {
        Self::build(false, true, None, reply)
    }

    /// `initialize` succeeds but the handle never becomes ready.
    pub fn never_ready() -> Self {
        Self::build(false, false, None, Reply::Row(None))
    }

    /// `initialize` fails with `message`.
    pub fn failing_init(message: &'static str) -> Self {
        Self::build(false, false, Some(message), Reply::Row(None))
    }

    fn build(ready: bool, becomes_ready: bool, init_error: Option<&'static str>, reply: Reply) -> Self {
        Self {
            ready: AtomicBool::new(ready),
            becomes_ready,
            init_error,
            reply,
            init_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            tables: Mutex::new(Vec::new()),
        }
    }

    pub fn init_count(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> SelectQuery {
        self.queries
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("a query should have been issued")
    }
}

impl ConnectionHandle for ScriptedHandle {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn initialize(&self) -> Result<(), BoxError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.init_error {
            return Err(message.into());
        }
        if self.becomes_ready {
            self.ready.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn accessor<'a>(&'a self, target: &Target) -> Result<Box<dyn Accessor + 'a>, BoxError> {
        self.tables.lock().unwrap().push(target.table().to_string());
        Ok(Box::new(ScriptedAccessor {
            handle: self,
            table: target.table().to_string(),
        }))
    }
}

struct ScriptedAccessor<'a> {
    handle: &'a ScriptedHandle,
    table: String,
}

impl Accessor for ScriptedAccessor<'_> {
    fn table(&self) -> &str {
        &self.table
    }

    fn fetch_one(&self, query: &SelectQuery) -> Result<Option<Row>, BoxError> {
        self.handle.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.handle.queries.lock().unwrap().push(query.clone());
        match &self.handle.reply {
            Reply::Row(row) => Ok(row.clone()),
            Reply::Fail(message) => Err((*message).into()),
            Reply::Panic(message) => panic!("{}", message),
            Reply::NotRegistered(name) => Err(Box::new(ValidatorError::not_registered(*name))),
        }
    }
}
