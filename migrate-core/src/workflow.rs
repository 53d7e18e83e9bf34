//! Pure lookup/graph utilities over workflow definitions (C2). Nothing
//! here performs I/O; C11 calls these to classify steps and to find the
//! penultimate step before publishing.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;

use migrate_api::WorkflowStepDefWire;
use migrate_api::WorkflowWire;
use uuid::Uuid;

use crate::error::MigrateError;

pub fn by_codename<'a>(workflows: &'a [WorkflowWire], codename: &str) -> Option<&'a WorkflowWire> {
    workflows.iter().find(|wf| wf.codename == codename)
}

/// Iterates every step of a workflow, including the published/archived/
/// scheduled pseudo-steps, in the order they're declared (`wf.steps` first,
/// then the three pseudo-steps) — this order is what "insertion order of
/// `wf.steps`" ties are broken against in `shortest_path`.
fn all_steps(wf: &WorkflowWire) -> impl Iterator<Item = &WorkflowStepDefWire> {
    wf.steps
        .iter()
        .chain(std::iter::once(&wf.published_step))
        .chain(std::iter::once(&wf.archived_step))
        .chain(std::iter::once(&wf.scheduled_step))
}

pub fn step_by_id<'a>(wf: &'a WorkflowWire, id: Uuid) -> Option<&'a WorkflowStepDefWire> {
    all_steps(wf).find(|step| step.id == id)
}

pub fn step_by_codename<'a>(
    wf: &'a WorkflowWire,
    codename: &str,
) -> Option<&'a WorkflowStepDefWire> {
    all_steps(wf).find(|step| step.codename == codename)
}

pub fn first_step(wf: &WorkflowWire) -> Result<&WorkflowStepDefWire, MigrateError> {
    wf.steps
        .first()
        .ok_or_else(|| MigrateError::config(format!("workflow {} declares no steps", wf.codename)))
}

pub fn is_published(wf: &WorkflowWire, codename: &str) -> bool {
    wf.published_step.codename == codename
}

pub fn is_archived(wf: &WorkflowWire, codename: &str) -> bool {
    wf.archived_step.codename == codename
}

pub fn is_scheduled(wf: &WorkflowWire, codename: &str) -> bool {
    wf.scheduled_step.codename == codename
}

fn step_order_index(wf: &WorkflowWire, id: Uuid) -> usize {
    all_steps(wf)
        .position(|step| step.id == id)
        .unwrap_or(usize::MAX)
}

/// BFS over the directed graph defined by each step's `transitions_to[]`.
/// Ties are broken by the insertion order of `wf.steps`: when a step has
/// several outgoing transitions, they are explored in the order their
/// targets appear in the workflow's own step list rather than the
/// (possibly arbitrary) order of `transitions_to` itself.
pub fn shortest_path(wf: &WorkflowWire, from: Uuid, to: Uuid) -> Option<Vec<Uuid>> {
    if from == to {
        return Some(vec![from]);
    }

    let mut parent: HashMap<Uuid, Uuid> = HashMap::new();
    let mut visited: HashSet<Uuid> = HashSet::from([from]);
    let mut queue: VecDeque<Uuid> = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        let Some(step) = step_by_id(wf, current) else {
            continue;
        };

        let mut targets: Vec<Uuid> = step.transitions_to.iter().filter_map(|r| r.id).collect();
        targets.sort_by_key(|id| step_order_index(wf, *id));

        for next_id in targets {
            if !visited.insert(next_id) {
                continue;
            }
            parent.insert(next_id, current);
            if next_id == to {
                return Some(reconstruct_path(&parent, from, to));
            }
            queue.push_back(next_id);
        }
    }
    None
}

fn reconstruct_path(parent: &HashMap<Uuid, Uuid>, from: Uuid, to: Uuid) -> Vec<Uuid> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        current = parent[&current];
        path.push(current);
    }
    path.reverse();
    path
}

/// The penultimate step on the shortest path from `from` to the workflow's
/// published step, because the platform only allows publishing from
/// specific predecessor steps (§4.2).
pub fn penultimate_before_published(wf: &WorkflowWire, from: Uuid) -> Option<Uuid> {
    let path = shortest_path(wf, from, wf.published_step.id)?;
    match path.len() {
        0 | 1 => Some(from),
        len => Some(path[len - 2]),
    }
}

#[cfg(test)]
mod tests {
    use migrate_api::ReferenceWire;

    use super::*;

    fn step(id: Uuid, codename: &str, transitions_to: Vec<Uuid>) -> WorkflowStepDefWire {
        WorkflowStepDefWire {
            id,
            codename: codename.to_string(),
            name: codename.to_string(),
            transitions_to: transitions_to.into_iter().map(ReferenceWire::by_id).collect(),
        }
    }

    fn sample_workflow() -> (WorkflowWire, Uuid, Uuid, Uuid, Uuid) {
        let draft = Uuid::from_u128(1);
        let review = Uuid::from_u128(2);
        let published = Uuid::from_u128(3);
        let archived = Uuid::from_u128(4);
        let scheduled = Uuid::from_u128(5);

        let wf = WorkflowWire {
            id: Uuid::from_u128(100),
            codename: "default".to_string(),
            name: "Default".to_string(),
            steps: vec![
                step(draft, "draft", vec![review, archived]),
                step(review, "review", vec![published, draft, archived]),
            ],
            published_step: step(published, "published", vec![draft]),
            archived_step: step(archived, "archived", vec![draft]),
            scheduled_step: step(scheduled, "scheduled", vec![]),
        };
        (wf, draft, review, published, archived)
    }

    #[test]
    fn finds_minimum_hop_path() {
        let (wf, draft, review, published, _archived) = sample_workflow();
        let path = shortest_path(&wf, draft, published).expect("path exists");
        assert_eq!(path, vec![draft, review, published]);
    }

    #[test]
    fn path_between_predecessor_and_published_has_length_one() {
        let (wf, _draft, review, published, _archived) = sample_workflow();
        let path = shortest_path(&wf, review, published).expect("path exists");
        assert_eq!(path.len(), 2);
        assert_eq!(path, vec![review, published]);
    }

    #[test]
    fn penultimate_step_is_immediate_predecessor() {
        let (wf, draft, review, _published, _archived) = sample_workflow();
        let penultimate = penultimate_before_published(&wf, draft).expect("reachable");
        assert_eq!(penultimate, review);
    }

    #[test]
    fn returns_none_when_unreachable() {
        let (wf, _draft, _review, _published, _archived) = sample_workflow();
        let scheduled = Uuid::from_u128(5);
        assert_eq!(shortest_path(&wf, scheduled, Uuid::from_u128(1)), None);
    }
}
