use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, Select,
    sea_query::{Expr, Func},
};

pub trait SearchInsensitive {
    /// Keep rows where any of `columns` contains `term`, ignoring case.
    /// A blank term leaves the query untouched.
    fn search_insensitive<C>(self, columns: &[C], term: &str) -> Self
    where
        C: ColumnTrait + Copy;
}

impl<E> SearchInsensitive for Select<E>
where
    E: EntityTrait,
{
    fn search_insensitive<C>(self, columns: &[C], term: &str) -> Self
    where
        C: ColumnTrait + Copy,
    {
        let term = term.trim();
        if term.is_empty() || columns.is_empty() {
            return self;
        }
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        let any = columns.iter().fold(Condition::any(), |cond, column| {
            cond.add(Expr::expr(Func::lower(Expr::col(*column))).like(pattern.clone()))
        });
        self.filter(any)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
