//! Dashboard navigation entries visible to each role.

use crate::role::Role;
use serde::Serialize;

/// One sidebar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub id: &'static str,
    pub label: &'static str,
    pub path: &'static str,
    /// Shown to patients only, whatever the role table says.
    pub patient_only: bool,
}

const fn item(id: &'static str, label: &'static str, path: &'static str) -> NavItem {
    NavItem {
        id,
        label,
        path,
        patient_only: false,
    }
}

pub const NAV_ITEMS: [NavItem; 11] = [
    item("dashboard", "Dashboard", "/dashboard"),
    item("dossiers", "Dossiers", "/dashboard/dossiers"),
    item("patients", "Patients", "/dashboard/patients"),
    item("assistants", "Assistants", "/dashboard/assistants"),
    item("rendezvous", "Rendez-vous", "/dashboard/rendezvous"),
    item("factures", "Factures", "/dashboard/factures"),
    item("rapports", "Rapports", "/dashboard/rapports"),
    NavItem {
        id: "chatbot",
        label: "Assistant Médical",
        path: "/dashboard/chatbot",
        patient_only: true,
    },
    item("messagerie", "Messagerie", "/dashboard/messagerie"),
    item("profil", "Mon Profil", "/dashboard/profil"),
    item("parametres", "Paramètres", "/dashboard/parametres"),
];

fn allowed_ids(role: Option<Role>) -> &'static [&'static str] {
    match role {
        Some(Role::Medecin) => &[
            "dashboard",
            "dossiers",
            "patients",
            "assistants",
            "rendezvous",
            "factures",
            "rapports",
            "messagerie",
            "profil",
            "parametres",
        ],
        Some(Role::Assistant) => &[
            "dashboard",
            "patients",
            "rendezvous",
            "factures",
            "messagerie",
            "profil",
            "parametres",
        ],
        Some(Role::Patient) => &[
            "dashboard",
            "rendezvous",
            "dossiers",
            "chatbot",
            "messagerie",
            "profil",
            "parametres",
        ],
        Some(Role::Unknown) | None => &["dashboard", "profil", "parametres"],
    }
}

/// Entries visible to `role` (`None` when signed out), in sidebar order.
pub fn visible_items(role: Option<Role>) -> Vec<&'static NavItem> {
    let allowed = allowed_ids(role);
    NAV_ITEMS
        .iter()
        .filter(|item| allowed.contains(&item.id))
        .filter(|item| !item.patient_only || role == Some(Role::Patient))
        .collect()
}

/// Whether `role` may see the entry at `path`.
pub fn can_access(role: Option<Role>, path: &str) -> bool {
    visible_items(role).iter().any(|item| item.path == path)
}
