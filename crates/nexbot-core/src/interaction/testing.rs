use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    errors::Error,
    interaction::requester::{Lifecycle, Requester, Visibility},
    logging::{LogRecord, LogSink},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyCall {
    Reply(String, Visibility),
    Edit(String),
}

pub struct FakeRequester {
    lifecycle: Lifecycle,
    repliable: bool,
    fail: bool,
    calls: Mutex<Vec<ReplyCall>>,
}

impl FakeRequester {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            repliable: true,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unrepliable(mut self) -> Self {
        self.repliable = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<ReplyCall> {
        self.calls.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<()> {
        if self.fail {
            Err(Error::External("interaction token expired".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Requester for FakeRequester {
    fn is_repliable(&self) -> bool {
        self.repliable
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    async fn reply(&self, content: &str, visibility: Visibility) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(ReplyCall::Reply(content.to_string(), visibility));
        self.outcome()
    }

    async fn edit_reply(&self, content: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(ReplyCall::Edit(content.to_string()));
        self.outcome()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn record(&self, record: LogRecord) {
        self.records.lock().unwrap().push(record);
    }
}
