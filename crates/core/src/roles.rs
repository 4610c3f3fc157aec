//! Well-known role name constants and directory role mapping.
//!
//! The local store only knows two roles. Directory roles are collapsed onto
//! them when a shadow user is provisioned.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Map a directory role name onto a local role.
///
/// `admin`, `manager`, and `root` collapse to the local `admin` role;
/// everything else (including unknown roles) becomes `user`.
pub fn map_directory_role(directory_role: &str) -> &'static str {
    match directory_role {
        "admin" | "manager" | "root" => ROLE_ADMIN,
        _ => ROLE_USER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_directory_roles_map_to_admin() {
        assert_eq!(map_directory_role("admin"), ROLE_ADMIN);
        assert_eq!(map_directory_role("manager"), ROLE_ADMIN);
        assert_eq!(map_directory_role("root"), ROLE_ADMIN);
    }

    #[test]
    fn everything_else_maps_to_user() {
        assert_eq!(map_directory_role("user"), ROLE_USER);
        assert_eq!(map_directory_role("viewer"), ROLE_USER);
        assert_eq!(map_directory_role(""), ROLE_USER);
        assert_eq!(map_directory_role("ADMIN"), ROLE_USER);
    }
}
