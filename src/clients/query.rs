//! Consultas ao PostgREST
//!
//! Monta filtros (`eq`, `in`), ordenação e limite de uma tabela e os
//! converte nos parâmetros de URL que o PostgREST entende. O mesmo
//! `Query` é avaliado em memória pelo `InMemoryGateway`.

use std::cmp::Ordering;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    In { column: String, values: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Consulta sobre uma tabela
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn in_<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.filters.push(Filter::In {
            column: column.to_string(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parâmetros no formato do PostgREST (ainda sem URL encoding)
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];

        for filter in &self.filters {
            match filter {
                Filter::Eq { column, value } => pairs.push((column.clone(), format!("eq.{}", value))),
                Filter::In { column, values } => {
                    let list = values.iter().map(|v| quote_list_value(v)).collect::<Vec<_>>().join(",");
                    pairs.push((column.clone(), format!("in.({})", list)));
                }
            }
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, o.direction.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        pairs
    }

    /// Query string pronta para a URL
    pub fn to_query_string(&self) -> String {
        self.to_query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Avalia os filtros sobre uma linha JSON
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq { column, value } => column_text(row, column).as_deref() == Some(value.as_str()),
            Filter::In { column, values } => match column_text(row, column) {
                Some(text) => values.iter().any(|v| *v == text),
                None => false,
            },
        })
    }

    /// Ordena as linhas como o Postgres faria (nulos por último em asc)
    pub fn sort(&self, rows: &mut [Value]) {
        if self.order.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for order in &self.order {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column), order.direction);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Projeta as colunas pedidas (`*` devolve a linha inteira)
    pub fn project(&self, row: &Value) -> Value {
        if self.columns.trim() == "*" {
            return row.clone();
        }
        let mut projected = serde_json::Map::new();
        for column in self.columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            projected.insert(column.to_string(), row.get(column).cloned().unwrap_or(Value::Null));
        }
        Value::Object(projected)
    }
}

/// Valores com caracteres reservados vão entre aspas dentro de `in.(...)`
fn quote_list_value(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Aproxima a ordenação do banco: sem diferença de caixa nem de acento
fn collation_key(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn compare_values(a: Option<&Value>, b: Option<&Value>, direction: Direction) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let ordering = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return if direction == Direction::Asc { Ordering::Greater } else { Ordering::Less },
        (Some(_), None) => return if direction == Direction::Asc { Ordering::Less } else { Ordering::Greater },
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .partial_cmp(&y.as_f64().unwrap_or_default())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => collation_key(x)
            .cmp(&collation_key(y))
            .then_with(|| x.cmp(y)),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    };
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs() {
        let query = Query::table("linhas")
            .eq("empresa_id", "abc")
            .order("created_at", Direction::Desc)
            .order("nome", Direction::Asc)
            .limit(5);
        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("empresa_id".to_string(), "eq.abc".to_string()),
                ("order".to_string(), "created_at.desc,nome.asc".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_in_filter_quotes_reserved_values() {
        let query = Query::table("viagens").select("id").in_("descricao", ["a", "b,c"]);
        let pairs = query.to_query_pairs();
        assert_eq!(pairs[1], ("descricao".to_string(), "in.(a,\"b,c\")".to_string()));
        assert_eq!(query.to_query_string(), "select=id&descricao=in.%28a%2C%22b%2Cc%22%29");
    }

    #[test]
    fn test_text_sort_ignores_case_and_accents() {
        let mut rows = vec![
            json!({"nome": "Zona Sul"}),
            json!({"nome": "Água Branca"}),
            json!({"nome": "centro"}),
            json!({"nome": "Estação"}),
        ];
        Query::table("linhas").order("nome", Direction::Asc).sort(&mut rows);
        let nomes: Vec<&str> = rows.iter().filter_map(|r| r["nome"].as_str()).collect();
        assert_eq!(nomes, vec!["Água Branca", "centro", "Estação", "Zona Sul"]);
    }

    #[test]
    fn test_matches_and_sort() {
        let rows = vec![
            json!({"id": "1", "linha_id": "x", "ordem": 2}),
            json!({"id": "2", "linha_id": "x", "ordem": 1}),
            json!({"id": "3", "linha_id": "y", "ordem": 3}),
        ];
        let query = Query::table("pontos_itinerario").eq("linha_id", "x").order("ordem", Direction::Asc);
        let mut selected: Vec<Value> = rows.iter().filter(|r| query.matches(r)).cloned().collect();
        query.sort(&mut selected);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0]["id"], "2");

        let numeric = Query::table("pontos_itinerario").eq("ordem", 3);
        assert!(numeric.matches(&rows[2]));

        let listed = Query::table("pontos_itinerario").in_("id", ["1", "3"]);
        assert_eq!(rows.iter().filter(|r| listed.matches(r)).count(), 2);
    }

    #[test]
    fn test_project_columns() {
        let row = json!({"id": "1", "linha_id": "x", "ordem": 2});
        assert_eq!(Query::table("t").select("id").project(&row), json!({"id": "1"}));
        assert_eq!(Query::table("t").project(&row), row);
    }
}
