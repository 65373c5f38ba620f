use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub String);

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GroupMember {
    pub id: GroupId,
    pub name: String,
}

/// A user defined categorization bucket. Entries reference members by id only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Group(pub Vec<GroupMember>);

impl Group {
    pub fn members(&self) -> impl Iterator<Item = &GroupMember> {
        self.0.iter()
    }

    pub fn member(&self, id: &GroupId) -> Option<&GroupMember> {
        self.0.iter().find(|member| &member.id == id)
    }
}

impl FromIterator<(String, String)> for Group {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(id, name)| GroupMember {
                    id: GroupId(id),
                    name,
                })
                .collect(),
        )
    }
}
