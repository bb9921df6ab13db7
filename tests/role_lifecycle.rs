//! End-to-end role lifecycle over the in-memory stores: create, rename,
//! assign, the owner ceiling, and deletion guards.

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use gardisto::error::{Error, Rule};
use gardisto::roles::{CreateRole, RoleService, UpdateRole};
use gardisto::store::memory::{MemoryRoleStore, MemoryUserStore};
use gardisto::store::User;
use gardisto::AuthConfig;

const NO_ROLES: &[String] = &[];

fn caller(role: &str) -> Vec<String> {
    vec![role.to_string()]
}

struct Fixture {
    service: RoleService,
    users: Arc<MemoryUserStore>,
}

fn fixture() -> Fixture {
    let roles = Arc::new(MemoryRoleStore::new());
    let users = Arc::new(MemoryUserStore::new());
    let service = RoleService::new(Arc::new(AuthConfig::new()), roles, users.clone());
    Fixture { service, users }
}

async fn seed_user(fixture: &Fixture) -> Uuid {
    let id = Uuid::new_v4();
    fixture
        .users
        .add_user(
            User {
                id,
                email: format!("{id}@example.com"),
                is_active: true,
            },
            "irrelevant",
        )
        .await;
    id
}

#[tokio::test]
async fn create_assign_and_delete_a_custom_role() -> Result<()> {
    let fixture = fixture();
    let user = seed_user(&fixture).await;

    let role = fixture
        .service
        .create_role(
            &caller("Admin"),
            CreateRole {
                name: "reviewer".to_string(),
                description: "Reviews submissions".to_string(),
                hierarchy_level: 10,
            },
        )
        .await?;
    assert!(!role.is_system_role);
    assert_eq!(role.hierarchy_level, 10);

    fixture
        .service
        .assign_role_to_user(&caller("Moderator"), user, "Reviewer")
        .await?;
    let held = fixture.service.roles_of_user(user).await?;
    assert_eq!(held.len(), 1);
    assert!(held[0].eq_ignore_ascii_case("reviewer"));

    // Assigned roles cannot be deleted.
    let blocked = fixture.service.delete_role(&caller("Admin"), role.id).await;
    assert!(matches!(
        blocked,
        Err(Error::Rule(Rule::RoleHasAssignedUsers))
    ));

    fixture
        .service
        .remove_role_from_user(&caller("Moderator"), user, "reviewer")
        .await?;
    fixture.service.delete_role(&caller("Admin"), role.id).await?;
    assert!(matches!(
        fixture.service.get_role_by_id(role.id).await,
        Err(Error::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn system_roles_are_immutable_and_reserved() -> Result<()> {
    let fixture = fixture();

    let reserved = fixture
        .service
        .create_role(
            &caller("Owner"),
            CreateRole {
                name: "ADMIN".to_string(),
                description: "shadow".to_string(),
                hierarchy_level: 5,
            },
        )
        .await;
    assert!(matches!(
        reserved,
        Err(Error::Rule(Rule::SystemRoleNameReserved))
    ));

    let ceiling = fixture
        .service
        .create_role(
            &caller("Owner"),
            CreateRole {
                name: "overlord".to_string(),
                description: "too high".to_string(),
                hierarchy_level: 20,
            },
        )
        .await;
    assert!(matches!(
        ceiling,
        Err(Error::Rule(Rule::InvalidHierarchyLevel))
    ));
    Ok(())
}

#[tokio::test]
async fn update_renames_without_tripping_its_own_uniqueness() -> Result<()> {
    let fixture = fixture();

    let role = fixture
        .service
        .create_role(
            &caller("Admin"),
            CreateRole {
                name: "triage".to_string(),
                description: "Sorts tickets".to_string(),
                hierarchy_level: 5,
            },
        )
        .await?;

    // Same name, new description: the role's own name is not a collision.
    let updated = fixture
        .service
        .update_role(
            &caller("Admin"),
            role.id,
            UpdateRole {
                name: "triage".to_string(),
                description: "Sorts and escalates tickets".to_string(),
                hierarchy_level: 7,
            },
        )
        .await?;
    assert_eq!(updated.hierarchy_level, 7);

    let other = fixture
        .service
        .create_role(
            &caller("Admin"),
            CreateRole {
                name: "intake".to_string(),
                description: "First contact".to_string(),
                hierarchy_level: 3,
            },
        )
        .await?;
    let collision = fixture
        .service
        .update_role(
            &caller("Admin"),
            other.id,
            UpdateRole {
                name: "Triage".to_string(),
                description: "First contact".to_string(),
                hierarchy_level: 3,
            },
        )
        .await;
    assert!(matches!(collision, Err(Error::Rule(Rule::RoleNameNotUnique))));
    Ok(())
}

#[tokio::test]
async fn authority_is_strictly_hierarchical() -> Result<()> {
    let fixture = fixture();
    let user = seed_user(&fixture).await;

    // A Moderator can hand out Support but not Admin or Moderator itself.
    fixture
        .service
        .assign_role_to_user(&caller("Moderator"), user, "Support")
        .await?;
    let peer = fixture
        .service
        .assign_role_to_user(&caller("Moderator"), user, "Moderator")
        .await;
    assert!(matches!(peer, Err(Error::Unauthorized)));
    let above = fixture
        .service
        .assign_role_to_user(&caller("Moderator"), user, "Admin")
        .await;
    assert!(matches!(above, Err(Error::Unauthorized)));

    // Support sits below the assignment-management threshold entirely.
    let below_threshold = fixture
        .service
        .assign_role_to_user(&caller("Support"), user, "User")
        .await;
    assert!(matches!(below_threshold, Err(Error::Unauthorized)));

    let unauthenticated = fixture
        .service
        .create_role(
            NO_ROLES,
            CreateRole {
                name: "anything".to_string(),
                description: "anything".to_string(),
                hierarchy_level: 1,
            },
        )
        .await;
    assert!(matches!(unauthenticated, Err(Error::Unauthorized)));
    Ok(())
}

#[tokio::test]
async fn owner_assignments_stop_at_the_ceiling() -> Result<()> {
    let fixture = fixture();
    let mut members = Vec::new();
    for _ in 0..4 {
        members.push(seed_user(&fixture).await);
    }

    for member in &members[..3] {
        fixture
            .service
            .assign_role_to_user(&caller("Owner"), *member, "Owner")
            .await?;
    }
    let fourth = fixture
        .service
        .assign_role_to_user(&caller("Owner"), members[3], "Owner")
        .await;
    assert!(matches!(fourth, Err(Error::Rule(Rule::MaxOwnersExceeded))));

    // Re-assigning an existing owner does not count against the ceiling.
    fixture
        .service
        .assign_role_to_user(&caller("Owner"), members[0], "Owner")
        .await?;
    Ok(())
}
