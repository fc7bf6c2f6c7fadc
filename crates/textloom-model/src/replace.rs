//! Tree replace: splice a slice into a document between two resolved
//! positions, joining the slice's open sides onto the surrounding nodes.
//!
//! The algorithm descends while both positions point into the same child,
//! then rebuilds the affected subtree by walking three frontiers (before
//! the gap, the slice, after the gap) and joining nodes level by level.
//! Joins are only legal between nodes whose types accept the same content
//! kind.

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::resolved_pos::ResolvedPos;
use crate::slice::Slice;

pub(crate) fn replace(
    rfrom: &ResolvedPos,
    rto: &ResolvedPos,
    slice: &Slice,
) -> Result<Node, ModelError> {
    if slice.open_start() > rfrom.depth() {
        return Err(ModelError::SliceTooDeep);
    }
    if rfrom.depth() - slice.open_start() != rto.depth() - slice.open_end() {
        return Err(ModelError::InconsistentOpenDepths {
            from_depth: rfrom.depth(),
            open_start: slice.open_start(),
            to_depth: rto.depth(),
            open_end: slice.open_end(),
        });
    }
    replace_outer(rfrom, rto, slice, 0)
}

fn replace_outer(
    rfrom: &ResolvedPos,
    rto: &ResolvedPos,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ModelError> {
    let index = rfrom.index(depth);
    let node = rfrom.node(depth);
    if index == rto.index(depth) && depth < rfrom.depth() - slice.open_start() {
        // both ends inside the same child: recurse without touching this level
        let inner = replace_outer(rfrom, rto, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content().size() == 0 {
        close(node, replace_two_way(rfrom, rto, depth)?)
    } else if slice.open_start() == 0
        && slice.open_end() == 0
        && rfrom.depth() == depth
        && rto.depth() == depth
    {
        // flat case: splice the slice content straight into the parent
        let parent = rfrom.parent();
        let content = parent.content();
        let new_content = content
            .cut(0, rfrom.parent_offset())
            .append(slice.content())
            .append(&content.cut(rto.parent_offset(), content.size()));
        close(parent, new_content)
    } else {
        let (start, end) = prepare_slice_for_replace(slice, rfrom)?;
        close(node, replace_three_way(rfrom, &start, &end, rto, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ModelError> {
    if !sub.node_type().compatible_content(main.node_type()) {
        return Err(ModelError::CannotJoin {
            parent: main.node_type().name().to_string(),
            child: sub.node_type().name().to_string(),
        });
    }
    Ok(())
}

fn joinable(
    before: &ResolvedPos,
    after: &ResolvedPos,
    depth: usize,
) -> Result<Node, ModelError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node.clone())
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    if let Some(last) = target.last()
        && child.is_text()
        && child.same_markup(last)
    {
        let joined = last.with_text(format!(
            "{}{}",
            last.text().unwrap_or(""),
            child.text().unwrap_or("")
        ));
        *target.last_mut().unwrap() = joined;
        return;
    }
    target.push(child);
}

fn add_range(
    start: Option<&ResolvedPos>,
    end: Option<&ResolvedPos>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let node = end.or(start).expect("add_range needs at least one side").node(depth);
    let mut start_index = 0;
    let end_index = match end {
        Some(e) => e.index(depth),
        None => node.child_count(),
    };
    if let Some(s) = start {
        start_index = s.index(depth);
        if s.depth() > depth {
            start_index += 1;
        } else if s.text_offset() > 0 {
            add_node(
                s.node_after().expect("text offset implies a node after"),
                target,
            );
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i).clone(), target);
    }
    if let Some(e) = end
        && e.depth() == depth
        && e.text_offset() > 0
    {
        add_node(
            e.node_before().expect("text offset implies a node before"),
            target,
        );
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node, ModelError> {
    node.node_type().check_content(&content)?;
    Ok(node.copy(content))
}

fn replace_three_way(
    rfrom: &ResolvedPos,
    start: &ResolvedPos,
    end: &ResolvedPos,
    rto: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ModelError> {
    let open_start = if rfrom.depth() > depth {
        Some(joinable(rfrom, start, depth + 1)?)
    } else {
        None
    };
    let open_end = if rto.depth() > depth {
        Some(joinable(end, rto, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(rfrom), depth, &mut content);

    if let (Some(os), Some(oe)) = (&open_start, &open_end)
        && start.index(depth) == end.index(depth)
    {
        check_join(os, oe)?;
        let inner = replace_three_way(rfrom, start, end, rto, depth + 1)?;
        add_node(close(os, inner)?, &mut content);
    } else {
        if let Some(os) = &open_start {
            add_node(close(os, replace_two_way(rfrom, start, depth + 1)?)?, &mut content);
        }
        add_range(Some(start), Some(end), depth, &mut content);
        if let Some(oe) = &open_end {
            add_node(close(oe, replace_two_way(end, rto, depth + 1)?)?, &mut content);
        }
    }
    add_range(Some(rto), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

fn replace_two_way(
    rfrom: &ResolvedPos,
    rto: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ModelError> {
    let mut content = Vec::new();
    add_range(None, Some(rfrom), depth, &mut content);
    if rfrom.depth() > depth {
        let node = joinable(rfrom, rto, depth + 1)?;
        let inner = replace_two_way(rfrom, rto, depth + 1)?;
        add_node(close(&node, inner)?, &mut content);
    }
    add_range(Some(rto), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

/// Wrap the slice content in copies of the nodes around the insertion
/// point so its open sides line up with the surrounding structure, and
/// resolve the start and end of the original content inside the wrapper.
fn prepare_slice_for_replace(
    slice: &Slice,
    along: &ResolvedPos,
) -> Result<(ResolvedPos, ResolvedPos), ModelError> {
    let extra = along.depth() - slice.open_start();
    let mut node = along.node(extra).copy(slice.content().clone());
    for depth in (0..extra).rev() {
        node = along.node(depth).copy(Fragment::from_node(node));
    }
    let start = node.resolve(slice.open_start() + extra)?;
    let end = node.resolve(node.content().size() - slice.open_end() - extra)?;
    Ok((start, end))
}
