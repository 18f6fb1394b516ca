// src/ranking.rs

use std::cmp::Ordering;

use sqlx::PgPool;

use crate::error::AppError;

/// Lightweight projection of one participation for rank assignment.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Standing {
    pub id: i64,
    pub obtained_marks: f64,
    /// Elapsed seconds; a participation without one sorts as zero and is
    /// therefore favored on ties.
    pub time_spent: i64,
}

/// Leaderboard order: obtained marks descending, then time spent ascending.
pub fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.obtained_marks
        .total_cmp(&a.obtained_marks)
        .then(a.time_spent.cmp(&b.time_spent))
}

/// Sorts standings into leaderboard order; the 1-based index of each row is
/// its rank.
pub fn sort_standings(rows: &mut [Standing]) {
    rows.sort_by(compare_standings);
}

/// Outcome of one ranking pass over a quiz.
#[derive(Debug, Default)]
pub struct RankingReport {
    pub assigned: usize,
    pub failed: usize,
}

/// Recomputes and persists ranks for every participation of one quiz.
///
/// Always a full rewrite: each row gets its 1-based position in the sorted
/// order, including rows whose rank did not change. A failed rank write is
/// logged and skipped so the rest of the batch still lands; the report says
/// how many writes succeeded. Idempotent, and safe to re-run concurrently
/// since every pass rewrites the complete ordering.
pub async fn recompute_ranks(pool: &PgPool, quiz_id: i64) -> Result<RankingReport, AppError> {
    let mut standings: Vec<Standing> = sqlx::query_as(
        "SELECT id, obtained_marks, COALESCE(time_spent, 0) AS time_spent \
         FROM participations WHERE quiz_id = $1",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    sort_standings(&mut standings);

    let mut report = RankingReport::default();
    for (idx, row) in standings.iter().enumerate() {
        let rank = (idx + 1) as i64;
        match sqlx::query("UPDATE participations SET rank = $1 WHERE id = $2")
            .bind(rank)
            .bind(row.id)
            .execute(pool)
            .await
        {
            Ok(_) => report.assigned += 1,
            Err(e) => {
                tracing::warn!(
                    "Failed to store rank {} for participation {}: {:?}",
                    rank,
                    row.id,
                    e
                );
                report.failed += 1;
            }
        }
    }

    if report.failed > 0 {
        tracing::warn!(
            "Ranking pass for quiz {} stored {} of {} ranks",
            quiz_id,
            report.assigned,
            report.assigned + report.failed
        );
    }

    Ok(report)
}
