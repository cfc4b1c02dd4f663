use sweep_engine::{PrivilegeTier, Requester};

pub(super) const PLAIN_GREETING: &str = "Hello, I'm here! 👋";

fn privilege_label(tier: PrivilegeTier) -> &'static str {
    match tier {
        PrivilegeTier::PrimaryOwner => "Primary Owner 👑",
        PrivilegeTier::Owner => "Owner 🔑",
        PrivilegeTier::Admin => "Admin ⚡",
        PrivilegeTier::Member => "Member 👤",
    }
}

fn delete_permissions_text(requester: &Requester, elevated_credential_configured: bool) -> &'static str {
    if !requester.has_elevated_rights() {
        "You can only delete your own messages."
    } else if elevated_credential_configured {
        "You can delete messages from anyone!"
    } else {
        "You can delete messages from anyone! (User token needed for full functionality)"
    }
}

/// Greeting posted in reply to a mention once the requester's roles are known.
pub(super) fn render_role_greeting(
    requester: &Requester,
    elevated_credential_configured: bool,
) -> String {
    let name = requester
        .roles
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown");
    format!(
        "Hello {name}! 👋\n\n*Your Status:* {}\n*Delete Permissions:* {}",
        privilege_label(requester.privilege_tier()),
        delete_permissions_text(requester, elevated_credential_configured),
    )
}
