//! SDF3 application graphs as scheduling instances.
//!
//! Actors become tasks, channels become dependencies (initial tokens give the
//! iteration distance) and every processor type named in `sdfProperties`
//! becomes a resource. Only the `applicationGraph` section is read.

use std::collections::BTreeMap;

use roxmltree::{Document, Node};

use crate::error::{ApspError, ApspResult};
use crate::instance::{DependencySpec, InstanceSpec, TaskSpec};

/// How actor and processor names are carried over.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Sdf3Naming {
    /// Names as written in the graph.
    #[default]
    Keep,

    /// `a<k>` actors become `t<k>`, `proc_<k>` processors become `r<k>`.
    Paper,

    /// Like [`Sdf3Naming::Paper`] with caller-chosen prefixes.
    Custom {
        /// Replaces the leading `a` of actor names.
        task: String,
        /// Replaces the leading `proc_` of processor names.
        resource: String,
    },
}

impl Sdf3Naming {
    fn prefixes(&self) -> Option<(&str, &str)> {
        match self {
            Sdf3Naming::Keep => None,
            Sdf3Naming::Paper => Some(("t", "r")),
            Sdf3Naming::Custom { task, resource } => Some((task.as_str(), resource.as_str())),
        }
    }

    fn task(&self, name: &str) -> String {
        match (self.prefixes(), name.strip_prefix('a')) {
            (Some((prefix, _)), Some(rest)) => format!("{}{}", prefix, rest),
            _ => name.to_string(),
        }
    }

    fn resource(&self, name: &str) -> String {
        match (self.prefixes(), name.strip_prefix("proc_")) {
            (Some((_, prefix)), Some(rest)) => format!("{}{}", prefix, rest),
            _ => name.to_string(),
        }
    }
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.has_tag_name(tag))
}

fn required<'a>(node: Node<'a, '_>, attr: &str) -> ApspResult<&'a str> {
    node.attribute(attr).ok_or_else(|| {
        ApspError::InvalidInstance(format!(
            "<{}> without a {} attribute",
            node.tag_name().name(),
            attr
        ))
    })
}

/// Convert SDF3 XML into an instance file.
///
/// The instance is named after the first `sdf` graph. Actors of every graph
/// in the application are merged. Each channel is kept as a dependency, so
/// parallel channels between the same actors all constrain the schedule.
pub fn from_sdf3_str(xml: &str, naming: &Sdf3Naming) -> ApspResult<InstanceSpec> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    if !root.has_tag_name("sdf3") {
        return Err(ApspError::InvalidInstance(format!(
            "expected an <sdf3> root, found <{}>",
            root.tag_name().name()
        )));
    }
    let Some(app) = children(root, "applicationGraph").next() else {
        return Err(ApspError::InvalidInstance("no <applicationGraph>".into()));
    };

    let mut name = String::new();
    let mut actors = Vec::new();
    let mut dependencies = Vec::new();
    for graph in children(app, "sdf") {
        if name.is_empty() {
            name = graph.attribute("name").unwrap_or("unnamed_graph").to_string();
        }
        for actor in children(graph, "actor") {
            actors.push(required(actor, "name")?);
        }
        for channel in children(graph, "channel") {
            let tokens = channel.attribute("initialTokens").unwrap_or("0");
            let tokens = tokens.trim().parse::<u32>().map_err(|_| {
                ApspError::InvalidInstance(format!("invalid initialTokens {:?}", tokens))
            })?;
            dependencies.push(DependencySpec {
                from: naming.task(required(channel, "srcActor")?),
                to: naming.task(required(channel, "dstActor")?),
                tokens,
            });
        }
    }

    // Processors in order of first appearance.
    let mut resources: Vec<String> = Vec::new();
    let mut durations: BTreeMap<&str, BTreeMap<String, f64>> = BTreeMap::new();
    for properties in children(app, "sdfProperties") {
        for actor in children(properties, "actorProperties") {
            let actor_name = required(actor, "actor")?;
            for processor in children(actor, "processor") {
                let Some(exec) = children(processor, "executionTime").next() else {
                    continue;
                };
                let resource = naming.resource(processor.attribute("type").unwrap_or("unknown"));
                let time = exec.attribute("time").unwrap_or("0");
                let time = time.trim().parse::<f64>().map_err(|_| {
                    ApspError::InvalidInstance(format!(
                        "invalid execution time {:?} for {}",
                        time, actor_name
                    ))
                })?;
                if !resources.contains(&resource) {
                    resources.push(resource.clone());
                }
                durations.entry(actor_name).or_default().insert(resource, time);
            }
        }
    }

    let tasks = actors
        .into_iter()
        .map(|actor| TaskSpec {
            name: naming.task(actor),
            durations: durations.get(actor).cloned().unwrap_or_default(),
        })
        .collect();

    log::debug!(
        "converted SDF3 graph {}: {} resources, {} dependencies",
        name,
        resources.len(),
        dependencies.len()
    );
    Ok(InstanceSpec {
        name,
        resources,
        tasks,
        dependencies,
    })
}
