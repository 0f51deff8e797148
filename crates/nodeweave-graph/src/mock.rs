//! Scripted query runner for tests.
//!
//! Responses are replayed in the order they were pushed, one per executed
//! statement, whether the statement runs inside a transaction or not. An
//! exhausted script answers with zero rows.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::GraphError;
use crate::runner::{QueryRunner, Row, Statement, Transaction};

/// A statement the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub statement: Statement,
    /// Index into [`MockRunner::transactions`], if run inside a transaction.
    pub transaction: Option<usize>,
}

/// Final state of a mock transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnOutcome {
    Open,
    Committed,
    RolledBack,
}

#[derive(Debug, Default)]
struct MockData {
    responses: VecDeque<Result<Vec<Row>, String>>,
    executed: Vec<Executed>,
    transactions: Vec<TxnOutcome>,
}

impl MockData {
    fn answer(
        &mut self,
        statement: &Statement,
        transaction: Option<usize>,
    ) -> Result<Vec<Row>, GraphError> {
        self.executed.push(Executed {
            statement: statement.clone(),
            transaction,
        });
        match self.responses.pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(msg)) => Err(GraphError::Execution(msg)),
            None => Ok(Vec::new()),
        }
    }
}

/// In-memory [`QueryRunner`] that replays scripted rows and records statements.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    data: Arc<Mutex<MockData>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next statement.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.data.lock().unwrap().responses.push_back(Ok(rows));
        self
    }

    /// Queue a single-row, single-column integer answer (e.g. `count(n) AS created`).
    pub fn push_count(&self, column: &str, count: i64) -> &Self {
        self.push_rows(vec![Row::new().with_value(column, count)])
    }

    /// Queue a failure for the next statement.
    pub fn push_error(&self, message: &str) -> &Self {
        self.data
            .lock()
            .unwrap()
            .responses
            .push_back(Err(message.to_string()));
        self
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.data.lock().unwrap().executed.clone()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.executed().into_iter().map(|e| e.statement).collect()
    }

    pub fn transactions(&self) -> Vec<TxnOutcome> {
        self.data.lock().unwrap().transactions.clone()
    }

    /// Scripted responses not consumed yet.
    pub fn pending(&self) -> usize {
        self.data.lock().unwrap().responses.len()
    }
}

#[async_trait]
impl QueryRunner for MockRunner {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>, GraphError> {
        self.data.lock().unwrap().answer(statement, None)
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, GraphError> {
        let mut data = self.data.lock().unwrap();
        data.transactions.push(TxnOutcome::Open);
        Ok(Box::new(MockTransaction {
            id: data.transactions.len() - 1,
            data: Arc::clone(&self.data),
        }))
    }
}

struct MockTransaction {
    id: usize,
    data: Arc<Mutex<MockData>>,
}

impl MockTransaction {
    fn close(&self, outcome: TxnOutcome) {
        self.data.lock().unwrap().transactions[self.id] = outcome;
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>, GraphError> {
        self.data.lock().unwrap().answer(statement, Some(self.id))
    }

    async fn commit(self: Box<Self>) -> Result<(), GraphError> {
        self.close(TxnOutcome::Committed);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), GraphError> {
        self.close(TxnOutcome::RolledBack);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::finish;

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let mock = MockRunner::new();
        mock.push_count("created", 1).push_error("boom");

        let first = mock.execute(&Statement::new("RETURN 1")).await.unwrap();
        assert_eq!(first[0].count("created"), Some(1));
        assert!(mock.execute(&Statement::new("RETURN 2")).await.is_err());
        assert!(mock.execute(&Statement::new("RETURN 3")).await.unwrap().is_empty());

        assert_eq!(mock.statements().len(), 3);
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn finish_commits_or_rolls_back() {
        let mock = MockRunner::new();

        let txn = mock.begin().await.unwrap();
        finish(txn, Ok(())).await.unwrap();

        let txn = mock.begin().await.unwrap();
        let outcome: Result<(), GraphError> = Err(GraphError::InvalidQuery("bad".into()));
        assert!(finish(txn, outcome).await.is_err());

        assert_eq!(
            mock.transactions(),
            vec![TxnOutcome::Committed, TxnOutcome::RolledBack]
        );
    }
}
