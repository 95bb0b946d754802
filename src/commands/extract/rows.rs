use super::types::{Row, TextRun};

pub const DEFAULT_Y_TOLERANCE: f64 = 3.0;

struct RowBucket {
    y: f64,
    runs: Vec<TextRun>,
}

// The bucket y is its first fragment's y and is never recomputed, so grouping
// depends on arrival order.
pub fn group_rows(runs: &[TextRun], tolerance: f64) -> Vec<Row> {
    let mut buckets = Vec::<RowBucket>::new();

    for run in runs {
        match buckets
            .iter_mut()
            .find(|bucket| (bucket.y - run.y).abs() <= tolerance)
        {
            Some(bucket) => bucket.runs.push(run.clone()),
            None => buckets.push(RowBucket {
                y: run.y,
                runs: vec![run.clone()],
            }),
        }
    }

    buckets.sort_by(|a, b| a.y.total_cmp(&b.y));

    buckets
        .into_iter()
        .map(|mut bucket| {
            bucket.runs.sort_by(|a, b| a.x.total_cmp(&b.x));
            bucket.runs
        })
        .collect()
}

pub fn row_text(row: &[TextRun]) -> String {
    row.iter()
        .map(|run| run.text.trim())
        .collect::<Vec<&str>>()
        .join(" ")
        .trim()
        .to_string()
}
