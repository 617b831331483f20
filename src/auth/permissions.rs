//! Roles and the static permission lists derived from them

/// User roles, named as they appear in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrador,
    Reclutador,
    Entrevistador,
    Visualizador,
}

impl Role {
    /// Case-insensitive parse of the role name
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_lowercase().as_str() {
            "administrador" | "admin" => Some(Role::Administrador),
            "reclutador" => Some(Role::Reclutador),
            "entrevistador" => Some(Role::Entrevistador),
            "visualizador" => Some(Role::Visualizador),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrador => "Administrador",
            Role::Reclutador => "Reclutador",
            Role::Entrevistador => "Entrevistador",
            Role::Visualizador => "Visualizador",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageUsers,
    ViewApplications,
    ManageApplications,
    ViewCandidates,
    ManageCandidates,
    ScheduleInterviews,
    ViewInterviews,
    CreateEvaluations,
    SendEmails,
    ProcessAi,
    ViewReports,
}

impl Permission {
    pub const ALL: [Permission; 11] = [
        Permission::ManageUsers,
        Permission::ViewApplications,
        Permission::ManageApplications,
        Permission::ViewCandidates,
        Permission::ManageCandidates,
        Permission::ScheduleInterviews,
        Permission::ViewInterviews,
        Permission::CreateEvaluations,
        Permission::SendEmails,
        Permission::ProcessAi,
        Permission::ViewReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageUsers => "gestionar_usuarios",
            Permission::ViewApplications => "ver_postulaciones",
            Permission::ManageApplications => "gestionar_postulaciones",
            Permission::ViewCandidates => "ver_candidatos",
            Permission::ManageCandidates => "gestionar_candidatos",
            Permission::ScheduleInterviews => "agendar_entrevistas",
            Permission::ViewInterviews => "ver_entrevistas",
            Permission::CreateEvaluations => "crear_evaluaciones",
            Permission::SendEmails => "enviar_correos",
            Permission::ProcessAi => "procesar_ia",
            Permission::ViewReports => "ver_reportes",
        }
    }
}

/// Static permission list for a role
pub fn permissions_for_role(role: Role) -> Vec<Permission> {
    match role {
        Role::Administrador => Permission::ALL.to_vec(),
        Role::Reclutador => Permission::ALL
            .into_iter()
            .filter(|p| *p != Permission::ManageUsers)
            .collect(),
        Role::Entrevistador => vec![
            Permission::ViewApplications,
            Permission::ViewCandidates,
            Permission::ViewInterviews,
            Permission::CreateEvaluations,
            Permission::ViewReports,
        ],
        Role::Visualizador => vec![
            Permission::ViewApplications,
            Permission::ViewCandidates,
            Permission::ViewInterviews,
            Permission::ViewReports,
        ],
    }
}

/// Permission strings stored alongside the user row
pub fn permission_strings(role: Role) -> Vec<String> {
    permissions_for_role(role)
        .iter()
        .map(|p| p.as_str().to_string())
        .collect()
}
