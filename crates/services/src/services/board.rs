use async_trait::async_trait;
use db::{
    DBService,
    models::task::{Task, TaskError, TaskStage, TaskWithPeople},
};
use thiserror::Error;
use uuid::Uuid;

/// Column order the board renders, left to right.
pub const STAGE_ORDER: [TaskStage; 5] = [
    TaskStage::Backlog,
    TaskStage::Todo,
    TaskStage::InProgress,
    TaskStage::Approved,
    TaskStage::Done,
];

/// What the board needs from the backend: the canonical transition
/// procedure and a full reload.
#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn transition(
        &self,
        task_id: Uuid,
        new_stage: TaskStage,
        performed_by: Uuid,
    ) -> Result<Task, TaskError>;

    async fn list(&self, organisation_id: Uuid) -> Result<Vec<TaskWithPeople>, TaskError>;
}

pub struct DbBoardStore {
    db: DBService,
}

impl DbBoardStore {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BoardStore for DbBoardStore {
    async fn transition(
        &self,
        task_id: Uuid,
        new_stage: TaskStage,
        performed_by: Uuid,
    ) -> Result<Task, TaskError> {
        Task::transition_stage(
            &self.db.conn,
            task_id,
            new_stage,
            performed_by,
            None,
            None,
            None,
        )
        .await
    }

    async fn list(&self, organisation_id: Uuid) -> Result<Vec<TaskWithPeople>, TaskError> {
        Task::find_by_organisation_with_people(&self.db.conn, organisation_id).await
    }
}

/// The in-memory task list backing the board. Exactly two mutations exist:
/// an optimistic stage write and wholesale replacement by server truth, so
/// the rollback path is one well-tested function rather than scattered
/// component state.
#[derive(Debug, Clone, Default)]
pub struct BoardCache {
    tasks: Vec<TaskWithPeople>,
}

impl BoardCache {
    pub fn new(tasks: Vec<TaskWithPeople>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[TaskWithPeople] {
        &self.tasks
    }

    pub fn stage_of(&self, task_id: Uuid) -> Option<TaskStage> {
        self.tasks
            .iter()
            .find(|task| task.id == task_id)
            .map(|task| task.stage)
    }

    pub fn column(&self, stage: TaskStage) -> Vec<&TaskWithPeople> {
        self.tasks
            .iter()
            .filter(|task| task.stage == stage)
            .collect()
    }

    /// Moves the task to its guessed new stage ahead of server
    /// confirmation. Returns false when the task is not on the board.
    pub fn apply_optimistic(&mut self, task_id: Uuid, new_stage: TaskStage) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == task_id) {
            Some(task) => {
                task.task.stage = new_stage;
                true
            }
            None => false,
        }
    }

    /// Replaces the cache with ground truth, discarding any optimistic
    /// guesses.
    pub fn reconcile(&mut self, server_truth: Vec<TaskWithPeople>) {
        self.tasks = server_truth;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The task was already in the requested stage; no server call was made.
    AlreadyInStage,
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Task is not on this board")]
    UnknownTask,
    /// The server rejected the move. `rolled_back` says whether the cache
    /// was reconciled against a fresh read or still holds the optimistic
    /// guess because the reload failed too.
    #[error("{notice}")]
    TransitionFailed { notice: String, rolled_back: bool },
}

/// One board instance per organisation and client session. Drag gestures
/// are serialized by the caller; the protocol itself makes no cross-session
/// guarantee.
pub struct Board<S: BoardStore> {
    organisation_id: Uuid,
    store: S,
    cache: BoardCache,
}

impl<S: BoardStore> Board<S> {
    pub async fn load(store: S, organisation_id: Uuid) -> Result<Self, TaskError> {
        let tasks = store.list(organisation_id).await?;
        Ok(Self {
            organisation_id,
            store,
            cache: BoardCache::new(tasks),
        })
    }

    pub fn cache(&self) -> &BoardCache {
        &self.cache
    }

    pub async fn refresh(&mut self) -> Result<(), TaskError> {
        let tasks = self.store.list(self.organisation_id).await?;
        self.cache.reconcile(tasks);
        Ok(())
    }

    /// The optimistic transition protocol: mutate the cache first, then ask
    /// the server. Success needs no follow-up read; failure reloads ground
    /// truth and surfaces a notice.
    pub async fn move_task(
        &mut self,
        task_id: Uuid,
        new_stage: TaskStage,
        performed_by: Uuid,
    ) -> Result<MoveOutcome, BoardError> {
        let current = self
            .cache
            .stage_of(task_id)
            .ok_or(BoardError::UnknownTask)?;
        if current == new_stage {
            return Ok(MoveOutcome::AlreadyInStage);
        }

        self.cache.apply_optimistic(task_id, new_stage);

        match self.store.transition(task_id, new_stage, performed_by).await {
            Ok(_) => Ok(MoveOutcome::Moved),
            Err(err) => {
                let notice = format!("Could not move task: {err}");
                match self.store.list(self.organisation_id).await {
                    Ok(truth) => {
                        self.cache.reconcile(truth);
                        Err(BoardError::TransitionFailed {
                            notice,
                            rolled_back: true,
                        })
                    }
                    Err(reload_err) => {
                        tracing::error!(
                            organisation = %self.organisation_id,
                            error = %reload_err,
                            "Board reload after failed transition also failed"
                        );
                        Err(BoardError::TransitionFailed {
                            notice: format!("{notice} (board refresh failed: {reload_err})"),
                            rolled_back: false,
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use chrono::Utc;
    use db::DbErr;
    use db::types::{TaskCategory, TaskPriority};

    use super::*;

    fn sample_task(title: &str, stage: TaskStage) -> TaskWithPeople {
        let now = Utc::now();
        TaskWithPeople {
            task: Task {
                id: Uuid::new_v4(),
                organisation_id: Uuid::new_v4(),
                title: title.to_string(),
                description: None,
                stage,
                priority: TaskPriority::Medium,
                category: TaskCategory::General,
                due_date: None,
                requires_approval: false,
                version: 1,
                creator_id: Uuid::new_v4(),
                assignee_id: None,
                client_id: None,
                completed_at: None,
                created_at: now,
                updated_at: now,
            },
            creator_name: "Admin".to_string(),
            assignee_name: None,
            client_name: None,
        }
    }

    struct FakeStore {
        truth: Mutex<Vec<TaskWithPeople>>,
        fail_transition: AtomicBool,
        fail_list: AtomicBool,
        transition_calls: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl FakeStore {
        fn new(truth: Vec<TaskWithPeople>) -> Self {
            Self {
                truth: Mutex::new(truth),
                fail_transition: AtomicBool::new(false),
                fail_list: AtomicBool::new(false),
                transition_calls: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BoardStore for &FakeStore {
        async fn transition(
            &self,
            task_id: Uuid,
            new_stage: TaskStage,
            _performed_by: Uuid,
        ) -> Result<Task, TaskError> {
            self.transition_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_transition.load(Ordering::SeqCst) {
                return Err(TaskError::Database(DbErr::Custom(
                    "backend unavailable".to_string(),
                )));
            }
            let mut truth = self.truth.lock().unwrap();
            let task = truth
                .iter_mut()
                .find(|task| task.id == task_id)
                .ok_or(TaskError::NotFound)?;
            task.task.stage = new_stage;
            Ok(task.task.clone())
        }

        async fn list(&self, _organisation_id: Uuid) -> Result<Vec<TaskWithPeople>, TaskError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(TaskError::Database(DbErr::Custom(
                    "backend unavailable".to_string(),
                )));
            }
            Ok(self.truth.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn same_stage_move_never_calls_the_server() {
        let task = sample_task("Chase invoice", TaskStage::Todo);
        let task_id = task.id;
        let store = FakeStore::new(vec![task]);

        let mut board = Board::load(&store, Uuid::new_v4()).await.unwrap();
        let outcome = board
            .move_task(task_id, TaskStage::Todo, Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(outcome, MoveOutcome::AlreadyInStage);
        assert_eq!(store.transition_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_move_keeps_optimistic_state_without_reread() {
        let task = sample_task("Chase invoice", TaskStage::Todo);
        let task_id = task.id;
        let store = FakeStore::new(vec![task]);

        let mut board = Board::load(&store, Uuid::new_v4()).await.unwrap();
        let lists_before = store.list_calls.load(Ordering::SeqCst);

        let outcome = board
            .move_task(task_id, TaskStage::InProgress, Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(outcome, MoveOutcome::Moved);
        assert_eq!(board.cache().stage_of(task_id), Some(TaskStage::InProgress));
        // The server is not re-read after a successful transition.
        assert_eq!(store.list_calls.load(Ordering::SeqCst), lists_before);
    }

    #[tokio::test]
    async fn failed_move_rolls_back_to_server_truth() {
        let task = sample_task("Chase invoice", TaskStage::Todo);
        let task_id = task.id;
        let store = FakeStore::new(vec![task]);

        let mut board = Board::load(&store, Uuid::new_v4()).await.unwrap();
        store.fail_transition.store(true, Ordering::SeqCst);

        let err = board
            .move_task(task_id, TaskStage::Done, Uuid::new_v4())
            .await
            .unwrap_err();

        match err {
            BoardError::TransitionFailed {
                notice,
                rolled_back,
            } => {
                assert!(rolled_back);
                assert!(!notice.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The rendered state matches a fresh read: the move never happened.
        assert_eq!(board.cache().stage_of(task_id), Some(TaskStage::Todo));
    }

    #[tokio::test]
    async fn failed_move_with_failed_reload_keeps_the_guess() {
        let task = sample_task("Chase invoice", TaskStage::Todo);
        let task_id = task.id;
        let store = FakeStore::new(vec![task]);

        let mut board = Board::load(&store, Uuid::new_v4()).await.unwrap();
        store.fail_transition.store(true, Ordering::SeqCst);
        store.fail_list.store(true, Ordering::SeqCst);

        let err = board
            .move_task(task_id, TaskStage::Done, Uuid::new_v4())
            .await
            .unwrap_err();

        match err {
            BoardError::TransitionFailed { rolled_back, .. } => assert!(!rolled_back),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(board.cache().stage_of(task_id), Some(TaskStage::Done));
    }

    #[tokio::test]
    async fn db_backed_store_runs_the_full_protocol() {
        use db::models::{
            organisation::{CreateOrganisation, Organisation},
            person::{CreatePerson, Person},
            task::CreateTask,
        };
        use sea_orm_migration::MigratorTrait;

        let conn = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&conn, None).await.unwrap();
        let db = DBService { conn };

        let admin = Person::create(
            &db.conn,
            &CreatePerson {
                display_name: "Admin".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let org = Organisation::create(
            &db.conn,
            &CreateOrganisation {
                name: "Harbour Tutoring".to_string(),
                owner_id: Some(admin.id),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let task = Task::create(
            &db.conn,
            org.id,
            &CreateTask {
                title: "Chase invoice".to_string(),
                description: None,
                priority: None,
                category: None,
                initial_stage: None,
                due_date: None,
                requires_approval: false,
                assignee_id: None,
                client_id: None,
            },
            admin.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let mut board = Board::load(DbBoardStore::new(db.clone()), org.id)
            .await
            .unwrap();

        // An unknown performer makes the server-side procedure reject the
        // move; the board must end up matching a fresh read.
        let err = board
            .move_task(task.id, TaskStage::Done, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::TransitionFailed {
                rolled_back: true,
                ..
            }
        ));
        assert_eq!(board.cache().stage_of(task.id), Some(TaskStage::Backlog));
        let fresh = Task::find_by_id(&db.conn, task.id).await.unwrap().unwrap();
        assert_eq!(fresh.stage, TaskStage::Backlog);

        // A legitimate move sticks on both sides without a re-read.
        board
            .move_task(task.id, TaskStage::Todo, admin.id)
            .await
            .unwrap();
        assert_eq!(board.cache().stage_of(task.id), Some(TaskStage::Todo));
        let fresh = Task::find_by_id(&db.conn, task.id).await.unwrap().unwrap();
        assert_eq!(fresh.stage, TaskStage::Todo);
    }

    #[tokio::test]
    async fn columns_group_by_stage() {
        let backlog = sample_task("One", TaskStage::Backlog);
        let doing = sample_task("Two", TaskStage::InProgress);
        let store = FakeStore::new(vec![backlog, doing]);

        let board = Board::load(&store, Uuid::new_v4()).await.unwrap();
        assert_eq!(board.cache().column(TaskStage::Backlog).len(), 1);
        assert_eq!(board.cache().column(TaskStage::InProgress).len(), 1);
        assert_eq!(board.cache().column(TaskStage::Done).len(), 0);
        assert_eq!(STAGE_ORDER.len(), 5);
    }
}
