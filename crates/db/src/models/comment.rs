use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::comment, models::ids};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("Task not found")]
    TaskNotFound,
    #[error("Comment author not found")]
    AuthorNotFound,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// A remark on a task. The thread is append-only: comments are never edited
/// or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateComment {
    pub body: String,
}

impl Comment {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        author_id: Uuid,
        data: &CreateComment,
    ) -> Result<Self, CommentError> {
        if data.body.trim().is_empty() {
            return Err(CommentError::ValidationError(
                "Comment text must not be empty".to_string(),
            ));
        }

        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(CommentError::TaskNotFound)?;
        let author_row_id = ids::person_id_by_uuid(db, author_id)
            .await?
            .ok_or(CommentError::AuthorNotFound)?;

        let active = comment::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            author_id: Set(author_row_id),
            body: Set(data.body.clone()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        Self::from_model(db, task_id, model).await
    }

    async fn from_model<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        model: comment::Model,
    ) -> Result<Self, CommentError> {
        let author_id = ids::person_uuid_by_id(db, model.author_id)
            .await?
            .ok_or(CommentError::AuthorNotFound)?;
        let author_name = author_display_name(db, model.author_id).await?;

        Ok(Self {
            id: model.uuid,
            task_id,
            author_id,
            author_name,
            body: model.body,
            created_at: model.created_at.into(),
        })
    }

    /// The task's comment thread in creation order, oldest first.
    pub async fn find_by_task_id<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, CommentError> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(CommentError::TaskNotFound)?;

        let models = comment::Entity::find()
            .filter(comment::Column::TaskId.eq(task_row_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(db)
            .await?;

        let mut comments = Vec::with_capacity(models.len());
        for model in models {
            comments.push(Self::from_model(db, task_id, model).await?);
        }
        Ok(comments)
    }
}

async fn author_display_name<C: ConnectionTrait>(db: &C, row_id: i64) -> Result<String, DbErr> {
    use sea_orm::QuerySelect;

    use crate::entities::person;

    let name: Option<String> = person::Entity::find()
        .select_only()
        .column(person::Column::DisplayName)
        .filter(person::Column::Id.eq(row_id))
        .into_tuple()
        .one(db)
        .await?;
    Ok(name.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        organisation::{CreateOrganisation, Organisation},
        person::{CreatePerson, Person},
        task::{CreateTask, Task},
    };

    use super::*;

    async fn setup() -> (sea_orm::DatabaseConnection, Uuid, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let admin = Person::create(
            &db,
            &CreatePerson {
                display_name: "Admin".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let org = Organisation::create(
            &db,
            &CreateOrganisation {
                name: "Bright Tutors".to_string(),
                owner_id: Some(admin.id),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let task = Task::create(
            &db,
            org.id,
            &CreateTask {
                title: "Welcome call".to_string(),
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

        (db, task.id, admin.id)
    }

    #[tokio::test]
    async fn rejects_blank_body() {
        let (db, task_id, author_id) = setup().await;

        let result = Comment::create(
            &db,
            task_id,
            author_id,
            &CreateComment {
                body: "  \n".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(CommentError::ValidationError(_))));

        let thread = Comment::find_by_task_id(&db, task_id).await.unwrap();
        assert!(thread.is_empty());
    }

    #[tokio::test]
    async fn thread_lists_in_creation_order() {
        let (db, task_id, author_id) = setup().await;

        for body in ["first", "second", "third"] {
            Comment::create(
                &db,
                task_id,
                author_id,
                &CreateComment {
                    body: body.to_string(),
                },
            )
            .await
            .unwrap();
        }

        let thread = Comment::find_by_task_id(&db, task_id).await.unwrap();
        let bodies: Vec<&str> = thread.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
        assert_eq!(thread[0].author_name, "Admin");
    }

    #[tokio::test]
    async fn unknown_task_is_reported() {
        let (db, _task_id, author_id) = setup().await;

        let result = Comment::create(
            &db,
            Uuid::new_v4(),
            author_id,
            &CreateComment {
                body: "hello".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(CommentError::TaskNotFound)));
    }
}
