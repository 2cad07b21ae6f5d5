//! Role-scoped access decisions.
//!
//! Pure functions over a static rule table. Every rule maps
//! (actor role, resource kind, action) to the scope of owners the actor may
//! touch; anything without a rule is denied. Call sites never branch on roles
//! themselves.

use crate::models::account::{Account, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Account,
    Invoice,
    Payment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

/// Which owners a rule reaches, relative to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Everything,
    /// Resources owned by the actor itself.
    Own,
    /// Resources owned by accounts the actor created (direct reports only).
    CreatedBySelf,
    OwnOrCreated,
    Nothing,
}

#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub email: &'a str,
    pub role: Role,
}

impl<'a> From<&'a Account> for Actor<'a> {
    fn from(account: &'a Account) -> Self {
        Self { email: &account.email, role: account.role }
    }
}

/// The account a resource belongs to (for accounts: the account itself).
#[derive(Debug, Clone, Copy)]
pub struct ResourceOwner<'a> {
    pub email: &'a str,
    pub role: Role,
    pub created_by: Option<&'a str>,
}

impl<'a> From<&'a Account> for ResourceOwner<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            email: &account.email,
            role: account.role,
            created_by: account.created_by.as_deref(),
        }
    }
}

struct Rule {
    role: Role,
    kind: ResourceKind,
    action: Action,
    scope: Scope,
}

const fn rule(role: Role, kind: ResourceKind, action: Action, scope: Scope) -> Rule {
    Rule { role, kind, action, scope }
}

use Action::{Create, Delete, Edit, View};
use ResourceKind as Kind;
use Scope::{CreatedBySelf, Everything, Own, OwnOrCreated};

const RULES: &[Rule] = &[
    // --- root ---
    rule(Role::Root, Kind::Account, View, Everything),
    rule(Role::Root, Kind::Account, Create, Everything),
    rule(Role::Root, Kind::Account, Edit, Everything),
    rule(Role::Root, Kind::Account, Delete, Everything),
    rule(Role::Root, Kind::Invoice, View, Everything),
    rule(Role::Root, Kind::Invoice, Create, Everything),
    rule(Role::Root, Kind::Invoice, Edit, Everything),
    rule(Role::Root, Kind::Invoice, Delete, Everything),
    rule(Role::Root, Kind::Payment, View, Everything),
    rule(Role::Root, Kind::Payment, Create, Everything),
    rule(Role::Root, Kind::Payment, Edit, Everything),
    rule(Role::Root, Kind::Payment, Delete, Everything),
    // --- admin ---
    rule(Role::Admin, Kind::Account, View, OwnOrCreated),
    rule(Role::Admin, Kind::Account, Create, CreatedBySelf),
    rule(Role::Admin, Kind::Account, Edit, OwnOrCreated),
    rule(Role::Admin, Kind::Account, Delete, CreatedBySelf),
    rule(Role::Admin, Kind::Invoice, View, CreatedBySelf),
    rule(Role::Admin, Kind::Invoice, Create, CreatedBySelf),
    rule(Role::Admin, Kind::Invoice, Edit, CreatedBySelf),
    rule(Role::Admin, Kind::Invoice, Delete, CreatedBySelf),
    rule(Role::Admin, Kind::Payment, View, CreatedBySelf),
    rule(Role::Admin, Kind::Payment, Create, CreatedBySelf),
    rule(Role::Admin, Kind::Payment, Edit, CreatedBySelf),
    rule(Role::Admin, Kind::Payment, Delete, CreatedBySelf),
    // --- user ---
    rule(Role::User, Kind::Account, View, Own),
    rule(Role::User, Kind::Account, Edit, Own),
    rule(Role::User, Kind::Invoice, View, Own),
    rule(Role::User, Kind::Invoice, Create, Own),
    rule(Role::User, Kind::Invoice, Edit, Own),
    rule(Role::User, Kind::Invoice, Delete, Own),
    rule(Role::User, Kind::Payment, View, Own),
    rule(Role::User, Kind::Payment, Create, Own),
];

/// Which role each role provisions.
const PROVISIONING: &[(Role, Role)] = &[(Role::Root, Role::Admin), (Role::Admin, Role::User)];

pub fn scope_for(role: Role, kind: ResourceKind, action: Action) -> Scope {
    RULES
        .iter()
        .find(|r| r.role == role && r.kind == kind && r.action == action)
        .map(|r| r.scope)
        .unwrap_or(Scope::Nothing)
}

/// Scope used to narrow list queries before per-row checks.
pub fn list_scope(role: Role, kind: ResourceKind) -> Scope {
    scope_for(role, kind, Action::View)
}

pub fn can_access(actor: Actor<'_>, owner: ResourceOwner<'_>, kind: ResourceKind, action: Action) -> bool {
    let is_self = owner.email.eq_ignore_ascii_case(actor.email);

    // Nobody removes itself through the management surface
    if kind == ResourceKind::Account && action == Action::Delete && is_self {
        return false;
    }

    // Root-owned data stays with root
    if owner.role == Role::Root && actor.role != Role::Root {
        return false;
    }

    let created_by_actor = owner
        .created_by
        .is_some_and(|creator| creator.eq_ignore_ascii_case(actor.email));

    match scope_for(actor.role, kind, action) {
        Scope::Everything => true,
        Scope::Own => is_self,
        Scope::CreatedBySelf => created_by_actor,
        Scope::OwnOrCreated => is_self || created_by_actor,
        Scope::Nothing => false,
    }
}

/// Role an actor gives to the accounts it provisions, if it may provision at all.
pub fn provisioned_role(actor_role: Role) -> Option<Role> {
    PROVISIONING
        .iter()
        .find(|(creator, _)| *creator == actor_role)
        .map(|(_, created)| *created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ROOT: &str = "root@shop.in";
    const ADMIN: &str = "admin@shop.in";
    const OTHER_ADMIN: &str = "other-admin@shop.in";
    const USER: &str = "user@shop.in";
    const FOREIGN_USER: &str = "foreign@shop.in";

    fn actor(email: &'static str, role: Role) -> Actor<'static> {
        Actor { email, role }
    }

    fn owner(email: &'static str, role: Role, created_by: Option<&'static str>) -> ResourceOwner<'static> {
        ResourceOwner { email, role, created_by }
    }

    #[rstest]
    // root sees everything but cannot delete itself
    #[case(actor(ROOT, Role::Root), owner(USER, Role::User, Some(ADMIN)), Kind::Invoice, View, true)]
    #[case(actor(ROOT, Role::Root), owner(ADMIN, Role::Admin, Some(ROOT)), Kind::Account, Delete, true)]
    #[case(actor(ROOT, Role::Root), owner(ROOT, Role::Root, None), Kind::Account, Delete, false)]
    // admin reaches direct reports only
    #[case(actor(ADMIN, Role::Admin), owner(USER, Role::User, Some(ADMIN)), Kind::Invoice, View, true)]
    #[case(actor(ADMIN, Role::Admin), owner(FOREIGN_USER, Role::User, Some(OTHER_ADMIN)), Kind::Invoice, View, false)]
    #[case(actor(ADMIN, Role::Admin), owner(ADMIN, Role::Admin, Some(ROOT)), Kind::Invoice, View, false)]
    #[case(actor(ADMIN, Role::Admin), owner(USER, Role::User, Some(ADMIN)), Kind::Account, Delete, true)]
    #[case(actor(ADMIN, Role::Admin), owner(ADMIN, Role::Admin, Some(ROOT)), Kind::Account, Delete, false)]
    #[case(actor(ADMIN, Role::Admin), owner(ADMIN, Role::Admin, Some(ROOT)), Kind::Account, Edit, true)]
    #[case(actor(ADMIN, Role::Admin), owner(ROOT, Role::Root, None), Kind::Account, View, false)]
    #[case(actor(ADMIN, Role::Admin), owner(ROOT, Role::Root, Some(ADMIN)), Kind::Account, Delete, false)]
    // user is confined to its own data
    #[case(actor(USER, Role::User), owner(USER, Role::User, Some(ADMIN)), Kind::Invoice, Delete, true)]
    #[case(actor(USER, Role::User), owner(FOREIGN_USER, Role::User, Some(ADMIN)), Kind::Invoice, View, false)]
    #[case(actor(USER, Role::User), owner(USER, Role::User, Some(ADMIN)), Kind::Payment, Delete, false)]
    #[case(actor(USER, Role::User), owner(USER, Role::User, Some(ADMIN)), Kind::Account, Delete, false)]
    #[case(actor(USER, Role::User), owner(FOREIGN_USER, Role::User, None), Kind::Account, View, false)]
    fn decides_access(
        #[case] actor: Actor<'static>,
        #[case] owner: ResourceOwner<'static>,
        #[case] kind: ResourceKind,
        #[case] action: Action,
        #[case] expected: bool,
    ) {
        assert_eq!(can_access(actor, owner, kind, action), expected);
    }

    #[test]
    fn email_comparison_ignores_case() {
        let actor = Actor { email: "admin@shop.in", role: Role::Admin };
        let owner = ResourceOwner { email: "u@shop.in", role: Role::User, created_by: Some("ADMIN@Shop.in") };
        assert!(can_access(actor, owner, Kind::Invoice, View));
    }

    #[test]
    fn provisioning_follows_hierarchy() {
        assert_eq!(provisioned_role(Role::Root), Some(Role::Admin));
        assert_eq!(provisioned_role(Role::Admin), Some(Role::User));
        assert_eq!(provisioned_role(Role::User), None);
    }

    #[test]
    fn unknown_combinations_are_denied() {
        assert_eq!(scope_for(Role::User, Kind::Account, Create), Scope::Nothing);
    }
}
