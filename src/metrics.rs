use crate::model::Job;
use std::borrow::Cow;
use std::collections::HashMap;

/// Count jobs per key, most frequent first, ties broken alphabetically.
/// Missing keys are counted under "Unknown".
pub fn count_by<F>(jobs: &[Job], key: F) -> Vec<(String, usize)>
where
    F: Fn(&Job) -> Option<Cow<'_, str>>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for job in jobs {
        let k = key(job).map_or_else(|| "Unknown".to_string(), |k| k.trim().to_string());
        *counts.entry(k).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Number of jobs that carry a salary of any kind.
pub fn salary_coverage(jobs: &[Job]) -> usize {
    jobs.iter().filter(|j| j.salary().is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn job(company: &str, source: &str, salary: Value) -> Job {
        Job::from(json!({"company": company, "source": source, "salary": salary}))
    }

    #[test]
    fn counts_are_ranked_then_alphabetical() {
        let jobs = vec![
            job("Beta", "Indeed", Value::Null),
            job("Acme", "RemoteOK", json!(90000)),
            job("Acme", "Indeed", json!(" ")),
            job("", "Indeed", Value::Null),
            job("Beta", "RemoteOK", json!("$90k")),
        ];

        assert_eq!(
            count_by(&jobs, Job::company),
            vec![
                ("Acme".to_string(), 2),
                ("Beta".to_string(), 2),
                ("Unknown".to_string(), 1)
            ]
        );
        assert_eq!(
            count_by(&jobs, Job::source),
            vec![("Indeed".to_string(), 3), ("RemoteOK".to_string(), 2)]
        );
        assert_eq!(salary_coverage(&jobs), 2);
    }

    #[test]
    fn empty_input() {
        assert!(count_by(&[], Job::company).is_empty());
        assert_eq!(salary_coverage(&[]), 0);
    }
}
