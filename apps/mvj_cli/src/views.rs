//! Terminal views. Presentational functions take plain props and return text;
//! the `*_props` functions build those props from the store through selectors.

use client_core::{selectors::*, store::errors::ErrorEntry, AppState};
use serde_json::Value;
use shared::{
    domain::LeaseId,
    protocol::{Attributes, FieldErrors},
};

pub const LEASE_COLUMNS: &[&str] = &["id", "identifier", "type", "municipality", "state"];
pub const CONTACT_COLUMNS: &[&str] = &[
    "id",
    "type",
    "name",
    "first_name",
    "last_name",
    "business_id",
];
pub const INVOICE_COLUMNS: &[&str] = &["id", "number", "due_date", "total_amount", "state"];
pub const RENT_BASIS_COLUMNS: &[&str] = &[
    "id",
    "plot_type",
    "start_date",
    "end_date",
    "detailed_plan_identifier",
];

pub struct TableProps<'a> {
    pub title: &'a str,
    pub columns: &'a [&'a str],
    pub rows: &'a [Value],
    /// Total on the server, when the collection is paginated.
    pub count: Option<u64>,
}

pub struct EntityProps<'a> {
    pub title: String,
    pub entity: Option<&'a Value>,
}

pub struct LeaseDetailProps<'a> {
    pub lease: EntityProps<'a>,
    pub comments: &'a [Value],
    pub invoices: &'a [Value],
}

/// Scalar cell text; nested records show their `name` when they have one.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(fields)) => match fields.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => Value::Object(fields.clone()).to_string(),
        },
        Some(other) => other.to_string(),
    }
}

pub fn render_table(props: &TableProps<'_>) -> String {
    let cells: Vec<Vec<String>> = props
        .rows
        .iter()
        .map(|row| props.columns.iter().map(|column| cell(row.get(*column))).collect())
        .collect();
    let widths: Vec<usize> = props
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.len()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut out = match props.count {
        Some(count) => format!("{} ({count} total)\n", props.title),
        None => format!("{}\n", props.title),
    };
    if props.rows.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }

    let line = |values: Vec<String>| {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };
    out.push_str(&line(props.columns.iter().map(|c| c.to_string()).collect()));
    for row in cells {
        out.push_str(&line(row));
    }
    out
}

pub fn render_lease_list(props: &TableProps<'_>) -> String {
    render_table(props)
}

pub fn render_entity(props: &EntityProps<'_>) -> String {
    let Some(entity) = props.entity else {
        return format!("{}: not loaded\n", props.title);
    };
    let mut out = format!("{}\n", props.title);
    match entity.as_object() {
        Some(fields) => {
            for (name, value) in fields {
                out.push_str(&format!("  {name}: {}\n", cell(Some(value))));
            }
        }
        None => out.push_str(&format!("  {entity}\n")),
    }
    out
}

pub fn render_comments(comments: &[Value]) -> String {
    if comments.is_empty() {
        return "Comments\n  (none)\n".to_string();
    }
    let mut out = String::from("Comments\n");
    for comment in comments {
        let topic = match comment.get("topic") {
            None | Some(Value::Null) => String::new(),
            Some(topic) => format!(" [{}]", cell(Some(topic))),
        };
        out.push_str(&format!(
            "  #{}{topic} {}\n",
            cell(comment.get("id")),
            cell(comment.get("text"))
        ));
    }
    out
}

pub fn render_invoices(invoices: &[Value]) -> String {
    render_table(&TableProps {
        title: "Invoices",
        columns: INVOICE_COLUMNS,
        rows: invoices,
        count: None,
    })
}

pub fn render_lease_detail(props: &LeaseDetailProps<'_>) -> String {
    [
        render_entity(&props.lease),
        render_comments(props.comments),
        render_invoices(props.invoices),
    ]
    .join("\n")
}

pub fn render_attributes(title: &str, attributes: Option<&Attributes>) -> String {
    let Some(attributes) = attributes.filter(|attributes| !attributes.is_empty()) else {
        return format!("{title}: no field metadata\n");
    };
    let mut out = format!("{title}\n");
    for name in attributes.names() {
        let Some(field) = attributes.field(name) else {
            continue;
        };
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.read_only {
            flags.push("read-only");
        }
        out.push_str(&format!(
            "  {name} ({}){}{}\n",
            field.field_type.as_deref().unwrap_or("?"),
            if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            },
            field
                .label
                .as_deref()
                .map(|label| format!(": {label}"))
                .unwrap_or_default(),
        ));
        for choice in &field.choices {
            out.push_str(&format!(
                "    - {} = {}\n",
                cell(Some(&choice.value)),
                choice.display_name
            ));
        }
    }
    out
}

pub fn render_errors(errors: &[ErrorEntry]) -> String {
    errors
        .iter()
        .map(|entry| match entry.status {
            Some(status) => format!("[{status}] {}", entry.message),
            None => entry.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_form_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .flat_map(|(field, messages)| {
            messages
                .iter()
                .map(move |message| format!("{field}: {message}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn lease_list_props(state: &AppState) -> TableProps<'_> {
    TableProps {
        title: "Leases",
        columns: LEASE_COLUMNS,
        rows: get_lease_rows(state),
        count: get_lease_list(state).map(|page| page.count),
    }
}

pub fn contact_list_props(state: &AppState) -> TableProps<'_> {
    TableProps {
        title: "Contacts",
        columns: CONTACT_COLUMNS,
        rows: get_contact_rows(state),
        count: get_contact_list(state).map(|page| page.count),
    }
}

pub fn rent_basis_list_props(state: &AppState) -> TableProps<'_> {
    TableProps {
        title: "Rent bases",
        columns: RENT_BASIS_COLUMNS,
        rows: get_rent_basis_rows(state),
        count: get_rent_basis_list(state).map(|page| page.count),
    }
}

pub fn lease_detail_props(state: &AppState, lease_id: LeaseId) -> LeaseDetailProps<'_> {
    LeaseDetailProps {
        lease: EntityProps {
            title: format!("Lease {lease_id}"),
            entity: get_lease_by_id(state, lease_id),
        },
        comments: get_comments_by_lease(state, lease_id),
        invoices: get_invoices_by_lease(state, lease_id),
    }
}
