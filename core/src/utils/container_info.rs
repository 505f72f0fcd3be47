/// Memory usage information about in-memory containers, used for diagnostics
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ContainerInfo {
    entries: Vec<ContainerInfoEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ContainerInfoEntry {
    Leaf {
        name: String,
        count: usize,
        sizeof_element: usize,
    },
    Node {
        name: String,
        info: ContainerInfo,
    },
}

impl ContainerInfo {
    pub fn builder() -> ContainerInfoBuilder {
        ContainerInfoBuilder::default()
    }

    pub fn leaf_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                ContainerInfoEntry::Leaf { .. } => 1,
                ContainerInfoEntry::Node { info, .. } => info.leaf_count(),
            })
            .sum()
    }

    pub fn get(&self, name: impl AsRef<str>) -> Option<(usize, usize)> {
        self.entries.iter().find_map(|entry| match entry {
            ContainerInfoEntry::Leaf {
                name: n,
                count,
                sizeof_element,
            } if n == name.as_ref() => Some((*count, *sizeof_element)),
            _ => None,
        })
    }
}

#[derive(Default)]
pub struct ContainerInfoBuilder {
    entries: Vec<ContainerInfoEntry>,
}

impl ContainerInfoBuilder {
    pub fn leaf(mut self, name: impl Into<String>, count: usize, sizeof_element: usize) -> Self {
        self.entries.push(ContainerInfoEntry::Leaf {
            name: name.into(),
            count,
            sizeof_element,
        });
        self
    }

    pub fn node(mut self, name: impl Into<String>, info: ContainerInfo) -> Self {
        self.entries.push(ContainerInfoEntry::Node {
            name: name.into(),
            info,
        });
        self
    }

    pub fn finish(self) -> ContainerInfo {
        ContainerInfo {
            entries: self.entries,
        }
    }
}

impl<const N: usize> From<[(&str, usize, usize); N]> for ContainerInfo {
    fn from(value: [(&str, usize, usize); N]) -> Self {
        let mut builder = ContainerInfo::builder();
        for (name, count, sizeof_element) in value {
            builder = builder.leaf(name, count, sizeof_element);
        }
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_nested() {
        let info = ContainerInfo::builder()
            .leaf("blocks", 2, 8)
            .node("queue", [("live", 1, 4)].into())
            .finish();
        assert_eq!(info.leaf_count(), 2);
        assert_eq!(info.get("blocks"), Some((2, 8)));
        assert_eq!(info.get("missing"), None);
    }
}
