//! Stock permissions document written on first start

/// Contents of a freshly generated permissions file.
pub const STOCK_DOCUMENT: &str = r#"# groupperms permissions file
#
# A permission node is a string like "permissions.build", usually starting
# with the name of the plugin. Each node is followed by true to grant that
# permission or false to revoke it. Nodes contain dots, so always quote them.
#
# Users inherit permissions from the groups they are a part of. If a user is
# not listed here they are in the group "default". Permissions for individual
# users go in a "permissions" table and override their group permissions.
# World permissions may be assigned with a "worlds.<world>" table.
#
# Groups can inherit permissions from other groups, and may override the
# permissions of their parent groups. Unlike users, groups do NOT
# automatically inherit from "default".

[users.conspiracywizard]
groups = ["admin"]

[users.conspiracywizard.permissions]
"permissions.example" = true

[groups.default.permissions]
"permissions.build" = false

[groups.user]
inheritance = ["default"]

[groups.user.permissions]
"permissions.build" = true

[groups.user.worlds.creative]
"coolplugin.item" = true

[groups.admin]
inheritance = ["user"]

[groups.admin.permissions]
"permissions.*" = true
"#;
