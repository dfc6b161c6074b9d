use std::collections::HashMap;

use db::{
    DBService, DbErr,
    models::{connection::Connection, organisation::Organisation, person::PersonSummary},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MemberResolveError {
    #[error("Organisation not found")]
    OrganisationNotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Derives the people eligible for task assignment in an organisation: the
/// owner plus everyone reachable through a bidirectional connection edge on
/// the organisation's member group. Both endpoints of every edge count,
/// whichever side initiated it.
///
/// Owner and edge lookups are best-effort. The result backs an assignee
/// picker, not a permission check, so a partially assembled set beats a hard
/// failure.
pub async fn resolve_organisation_members(
    db: &DBService,
    organisation_id: Uuid,
) -> Result<Vec<PersonSummary>, MemberResolveError> {
    let organisation = Organisation::find_by_id(&db.conn, organisation_id)
        .await?
        .ok_or(MemberResolveError::OrganisationNotFound)?;

    let mut members: HashMap<Uuid, PersonSummary> = HashMap::new();

    match organisation.find_owner(&db.conn).await {
        Ok(Some(owner)) => {
            members.insert(owner.id, owner.summary());
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(
                organisation = %organisation_id,
                error = %err,
                "Owner lookup failed; continuing with edge enumeration"
            );
        }
    }

    match Connection::find_by_group_id(&db.conn, organisation.member_group_id).await {
        Ok(edges) => {
            for edge in edges {
                members.entry(edge.source.id).or_insert(edge.source);
                members.entry(edge.target.id).or_insert(edge.target);
            }
        }
        Err(err) => {
            tracing::warn!(
                organisation = %organisation_id,
                error = %err,
                "Edge enumeration failed; returning partially resolved member set"
            );
        }
    }

    let mut resolved: Vec<PersonSummary> = members.into_values().collect();
    resolved.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(resolved)
}
