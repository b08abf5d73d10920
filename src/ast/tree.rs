use super::node::{DataType, Modifiers, NodeKind, Op, Payload};

/// Child vectors grow in fixed chunks to bound reallocation cost on the
/// append-heavy rewrite passes.
const CHILD_CHUNK: usize = 8;

/// Indices of the three mandatory `FnBody` blocks. A fourth child, when
/// present, is the function's return expression.
pub const BODY_VARS: usize = 0;
pub const BODY_FUNCS: usize = 1;
pub const BODY_STMTS: usize = 2;

/// Handle into the node store. Identity-carrying: two ids compare equal only
/// if they name the same live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub modifiers: Modifiers,
    pub data_type: DataType,
    pub payload: Payload,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, data_type: DataType, payload: Payload) -> Self {
        Self {
            kind,
            modifiers: Modifiers::empty(),
            data_type,
            payload,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn name(&self) -> Option<&str> {
        self.payload.name()
    }
}

/// The node store. Owns every node of a tree in a slab with a free list;
/// structure is expressed through `NodeId` edges, so passes can hold ids
/// across arbitrary mutation of the tree around them.
#[derive(Debug, Default)]
pub struct Ast {
    slots: Vec<Option<Node>>,
    free: Vec<u32>,
    live: usize,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes in the store.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slots
            .get(id.index())
            .map_or(false, |slot| slot.is_some())
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(i) => {
                self.slots[i as usize] = Some(node);
                NodeId(i)
            }
            None => {
                self.slots.push(Some(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.add_with(kind, DataType::Unknown, Payload::None)
    }

    pub fn add_with(&mut self, kind: NodeKind, data_type: DataType, payload: Payload) -> NodeId {
        self.alloc(Node::new(kind, data_type, payload))
    }

    pub fn block(&mut self) -> NodeId {
        self.add(NodeKind::Block)
    }

    pub fn int_const(&mut self, value: i64) -> NodeId {
        self.add_with(NodeKind::Const, DataType::Int, Payload::Int(value))
    }

    pub fn float_const(&mut self, value: f64) -> NodeId {
        self.add_with(NodeKind::Const, DataType::Float, Payload::Float(value))
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.add_with(
            NodeKind::Const,
            DataType::Ident,
            Payload::Name(name.to_string()),
        )
    }

    pub fn assign(&mut self, target: &str) -> NodeId {
        self.add_with(
            NodeKind::Assign,
            DataType::Unknown,
            Payload::Name(target.to_string()),
        )
    }

    pub fn bin_op(&mut self, op: Op) -> NodeId {
        self.add_with(NodeKind::BinOp, DataType::Unknown, Payload::Op(op))
    }

    pub fn unary_op(&mut self, op: Op) -> NodeId {
        self.add_with(NodeKind::UnaryOp, DataType::Unknown, Payload::Op(op))
    }

    pub fn var_dec(&mut self, name: &str, data_type: DataType) -> NodeId {
        self.add_with(NodeKind::VarDec, data_type, Payload::Name(name.to_string()))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.slots[id.index()].as_ref().expect("access to freed node")
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.index()].as_mut().expect("access to freed node")
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> NodeId {
        self.node(id).children[index]
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name()
    }

    /// Attach `child` as the last child of `parent`. The child must be
    /// detached.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let index = self.child_count(parent);
        self.insert(parent, child, index);
    }

    /// Attach `child` at `index`, shifting the following siblings right.
    pub fn insert(&mut self, parent: NodeId, child: NodeId, index: usize) {
        assert!(
            self.node(child).parent.is_none(),
            "insert of a node that is still attached"
        );
        self.node_mut(child).parent = Some(parent);
        let children = &mut self.node_mut(parent).children;
        assert!(index <= children.len(), "insert index out of bounds");
        if children.len() == children.capacity() {
            children.reserve_exact(CHILD_CHUNK);
        }
        children.insert(index, child);
    }

    /// Detach `child` from `parent` by identity, shifting the following
    /// siblings left, and return it for reuse or freeing. Fatal if the node
    /// is not actually a child of the given parent.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> NodeId {
        let index = self
            .position(parent, child)
            .expect("removed node is not a child of the given parent");
        self.node_mut(parent).children.remove(index);
        self.node_mut(child).parent = None;
        child
    }

    /// Index of `child` in `parent`'s child list, if it is attached there.
    pub fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Deep copy of the subtree rooted at `id`. Owned payloads are
    /// duplicated; the clone shares no mutable state with the source.
    pub fn clone_tree(&mut self, id: NodeId) -> NodeId {
        let source = self.node(id);
        let copy = Node::new(source.kind, source.data_type, source.payload.clone());
        let modifiers = source.modifiers;
        let children: Vec<NodeId> = source.children.clone();
        let clone = self.alloc(copy);
        self.node_mut(clone).modifiers = modifiers;
        for child in children {
            let child_clone = self.clone_tree(child);
            self.append(clone, child_clone);
        }
        clone
    }

    /// Release the subtree rooted at `id`. The node must be detached; a
    /// subtree that was detached and reattached elsewhere is owned there and
    /// must not be freed through a stale id.
    pub fn free(&mut self, id: NodeId) {
        assert!(
            self.node(id).parent.is_none(),
            "free of a node that is still attached"
        );
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let node = self.slots[next.index()]
                .take()
                .expect("double free of node");
            pending.extend(node.children);
            self.free.push(next.0);
            self.live -= 1;
        }
    }

    /// Release a single node whose children have already been reparented.
    pub fn free_node(&mut self, id: NodeId) {
        let node = self.node(id);
        assert!(
            node.parent.is_none(),
            "free of a node that is still attached"
        );
        assert!(
            node.children.is_empty(),
            "leaf free of a node that still owns children"
        );
        self.slots[id.index()].take();
        self.free.push(id.0);
        self.live -= 1;
    }

    /// Innermost `FnHead` above (or at) `id`. The root is never considered.
    pub fn enclosing_fn_head(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if self.kind(current) == NodeKind::FnHead {
                return Some(current);
            }
            current = parent;
        }
        None
    }

    /// Innermost `FnBody` above (or at) `id`.
    pub fn enclosing_fn_body(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if self.kind(current) == NodeKind::FnBody {
                return Some(current);
            }
            current = parent;
        }
        None
    }

    /// One of the three mandatory blocks of a function body, padding the body
    /// to three blocks on first access. Malformed bodies are a structural
    /// failure for the calling phase.
    pub fn body_block(&mut self, fn_body: NodeId, index: usize) -> Result<NodeId, String> {
        if self.kind(fn_body) != NodeKind::FnBody {
            return Err(format!(
                "body_block on a {} node",
                self.kind(fn_body).name()
            ));
        }
        if index > BODY_STMTS {
            return Err(format!("body block index {} out of range", index));
        }
        while self.child_count(fn_body) < 3 {
            let block = self.block();
            self.append(fn_body, block);
        }
        if self.child_count(fn_body) > 4 {
            return Err(format!(
                "fn_body with {} children",
                self.child_count(fn_body)
            ));
        }
        for i in 0..3 {
            let child = self.child(fn_body, i);
            if self.kind(child) != NodeKind::Block {
                return Err(format!(
                    "fn_body child {} is a {}, expected a block",
                    i,
                    self.kind(child).name()
                ));
            }
        }
        Ok(self.child(fn_body, index))
    }
}
