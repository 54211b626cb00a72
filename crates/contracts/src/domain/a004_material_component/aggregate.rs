use serde::{Deserialize, Serialize};

/// Ребро спецификации: родительский товар потребляет дочерний в количестве `quantity`.
/// Один дочерний компонент может входить в несколько родителей; циклы не проверяются.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialComponent {
    pub id: i64,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(rename = "childId")]
    pub child_id: Option<i64>,
    pub quantity: f64,
}
