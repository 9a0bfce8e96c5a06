//! Static role and permission catalog.
//!
//! Pure lookups over const tables; nothing here mutates at runtime and
//! nothing here performs I/O. Role `level` is display metadata only: no
//! check anywhere derives authority from it, and grants never cascade
//! between roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    pub const ALL: &'static [Role] = &[Role::Admin, Role::Teacher, Role::Student];
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    BookManage,
    BorrowingManage,
    VisitorManage,
    ReportExport,
    GradeManage,
    GradeView,
    BorrowingView,
    ProfileEdit,
}

pub struct RoleDef {
    pub role: Role,
    pub display_name: &'static str,
    pub level: u8,
}

pub struct PermissionDef {
    pub permission: Permission,
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub allowed_roles: &'static [Role],
}

const ROLES: &[RoleDef] = &[
    RoleDef {
        role: Role::Admin,
        display_name: "Administrator",
        level: 100,
    },
    RoleDef {
        role: Role::Teacher,
        display_name: "Teacher",
        level: 50,
    },
    RoleDef {
        role: Role::Student,
        display_name: "Student",
        level: 10,
    },
];

const PERMISSIONS: &[PermissionDef] = &[
    PermissionDef {
        permission: Permission::BookManage,
        name: "book_manage",
        display_name: "Manage books",
        description: "Create, edit, and retire catalog entries",
        allowed_roles: &[Role::Admin],
    },
    PermissionDef {
        permission: Permission::BorrowingManage,
        name: "borrowing_manage",
        display_name: "Manage borrowings",
        description: "Issue, extend, and return borrowings for any member",
        allowed_roles: &[Role::Admin],
    },
    PermissionDef {
        permission: Permission::VisitorManage,
        name: "visitor_manage",
        display_name: "Manage visitors",
        description: "Record and review library visits",
        allowed_roles: &[Role::Admin],
    },
    PermissionDef {
        permission: Permission::ReportExport,
        name: "report_export",
        display_name: "Export reports",
        description: "Download borrowing and visitor reports",
        allowed_roles: &[Role::Admin, Role::Teacher],
    },
    PermissionDef {
        permission: Permission::GradeManage,
        name: "grade_manage",
        display_name: "Manage grades",
        description: "Enter and amend grades for taught classes",
        allowed_roles: &[Role::Teacher],
    },
    PermissionDef {
        permission: Permission::GradeView,
        name: "grade_view",
        display_name: "View grades",
        description: "See own grade transcript",
        allowed_roles: &[Role::Student],
    },
    PermissionDef {
        permission: Permission::BorrowingView,
        name: "borrowing_view",
        display_name: "View borrowings",
        description: "See own current and past borrowings",
        allowed_roles: &[Role::Student],
    },
    PermissionDef {
        permission: Permission::ProfileEdit,
        name: "profile_edit",
        display_name: "Edit profile",
        description: "Update own contact details",
        allowed_roles: &[Role::Student, Role::Teacher],
    },
];

#[must_use]
pub fn role_def(role: Role) -> &'static RoleDef {
    // ROLES covers every variant; pinned by a test below.
    ROLES
        .iter()
        .find(|def| def.role == role)
        .unwrap_or(&ROLES[0])
}

#[must_use]
pub fn permission_def(permission: Permission) -> &'static PermissionDef {
    PERMISSIONS
        .iter()
        .find(|def| def.permission == permission)
        .unwrap_or(&PERMISSIONS[0])
}

#[must_use]
pub fn role_has(role: Role, permission: Permission) -> bool {
    permission_def(permission).allowed_roles.contains(&role)
}

#[must_use]
pub fn permissions_for(role: Role) -> Vec<&'static PermissionDef> {
    PERMISSIONS
        .iter()
        .filter(|def| def.allowed_roles.contains(&role))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_round_trips() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse(), Ok(*role));
        }
        assert!("librarian".parse::<Role>().is_err());
    }

    #[test]
    fn roles_table_covers_all_variants() {
        for role in Role::ALL {
            assert_eq!(role_def(*role).role, *role);
        }
    }

    #[test]
    fn permissions_table_covers_all_variants() {
        for permission in [
            Permission::BookManage,
            Permission::BorrowingManage,
            Permission::VisitorManage,
            Permission::ReportExport,
            Permission::GradeManage,
            Permission::GradeView,
            Permission::BorrowingView,
            Permission::ProfileEdit,
        ] {
            let def = permission_def(permission);
            assert_eq!(def.permission, permission);
            assert!(!def.allowed_roles.is_empty(), "{} has no roles", def.name);
        }
    }

    #[test]
    fn book_manage_is_admin_only() {
        assert!(role_has(Role::Admin, Permission::BookManage));
        assert!(!role_has(Role::Teacher, Permission::BookManage));
        assert!(!role_has(Role::Student, Permission::BookManage));
    }

    #[test]
    fn admin_does_not_inherit_teacher_grants() {
        // Levels are advisory only: admin outranks teacher on paper but has
        // no implicit claim on grade management.
        assert!(role_def(Role::Admin).level > role_def(Role::Teacher).level);
        assert!(!role_has(Role::Admin, Permission::GradeManage));
    }

    #[test]
    fn permissions_for_student_matches_grants() {
        let names: Vec<&str> = permissions_for(Role::Student)
            .iter()
            .map(|def| def.name)
            .collect();
        assert_eq!(names, ["grade_view", "borrowing_view", "profile_edit"]);
    }
}
