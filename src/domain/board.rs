use serde::Deserialize;

/// Any Trello object identified by an id and a display name: boards, lists and labels.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: String,
    pub id_member: Option<String>,
    pub member: Option<MemberProfile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub full_name: Option<String>,
    pub username: Option<String>,
}

impl Membership {
    pub fn member_id(&self) -> &str {
        self.id_member.as_deref().unwrap_or(&self.id)
    }

    fn is_named_any(&self, names: &[String]) -> bool {
        let Some(profile) = &self.member else {
            return false;
        };
        [profile.full_name.as_deref(), profile.username.as_deref()]
            .into_iter()
            .flatten()
            .any(|candidate| names.iter().any(|name| name == candidate))
    }
}

/// Id of the first resource whose name equals `name` exactly.
pub fn first_id_named(resources: &[NamedResource], name: &str) -> Option<String> {
    resources
        .iter()
        .find(|resource| resource.name == name)
        .map(|resource| resource.id.clone())
}

/// Ids of every resource whose name appears in `names`, in collection order.
pub fn ids_named(resources: &[NamedResource], names: &[String]) -> Vec<String> {
    resources
        .iter()
        .filter(|resource| names.contains(&resource.name))
        .map(|resource| resource.id.clone())
        .collect()
}

pub fn member_ids_named(memberships: &[Membership], names: &[String]) -> Vec<String> {
    memberships
        .iter()
        .filter(|membership| membership.is_named_any(names))
        .map(|membership| membership.member_id().to_string())
        .collect()
}
