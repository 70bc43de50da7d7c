//! Petri net I/O — the thin, out-of-scope wrapper named by `spec.md` §1/§6.
//! Parses `.net` (Tina textual net) and a minimal `.pnml` place list, and
//! exports the `.nupn` hierarchical unit format the oracle consumes.
//!
//! These parsers are not the hard part of this crate; they exist so the
//! driver has something concrete to hand the external collaborators.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{KongError, Result};
use crate::nupn::Nupn;

/// A Petri net: places, optional initial marking, and (for `.net` only)
/// transition pre/post arcs, kept only so a reduced net can be
/// round-tripped without ever firing a transition.
#[derive(Debug, Clone, Default)]
pub struct PetriNet {
    pub places: Vec<String>,
    pub initial_places: Vec<String>,
    pub order: HashMap<String, usize>,
    pub pre: Vec<(String, Vec<String>)>,
    pub post: Vec<(String, Vec<String>)>,
    pub nupn: Option<Nupn>,
}

impl PetriNet {
    /// Parse a net from `path`, dispatching on its extension.
    pub fn parse(path: &Path) -> Result<PetriNet> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("net") => Self::parse_net(path),
            Some("pnml") => Self::parse_pnml(path),
            other => Err(KongError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("unsupported net extension: {other:?}"),
                ),
            }),
        }
    }

    fn read(path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| KongError::io(path, e))
    }

    /// `.net` (Tina textual format): one `pl NAME (1)?` line per place,
    /// one `tr NAME pre... -> post...` line per transition.
    fn parse_net(path: &Path) -> Result<PetriNet> {
        let text = Self::read(path)?;
        Ok(PetriNet::from_net_text(&text))
    }

    /// Parse `.net` text already held in memory — the reducer's stdout
    /// never touches disk before the driver needs its place list.
    pub fn from_net_text(text: &str) -> PetriNet {
        let mut net = PetriNet::default();

        for line in text.lines() {
            let mut tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            let element = tokens.remove(0);
            match element {
                "pl" => net.parse_place(&tokens),
                "tr" => net.parse_transition(&tokens),
                _ => {}
            }
        }

        for (i, place) in net.places.iter().enumerate() {
            net.order.insert(place.clone(), i);
        }
        net
    }

    fn parse_place(&mut self, tokens: &[&str]) {
        let Some(&raw) = tokens.first() else { return };
        let place = strip_braces(raw);
        if !self.places.contains(&place) {
            self.places.push(place.clone());
        }
        if tokens.get(1) == Some(&"(1)") {
            self.initial_places.push(place);
        }
    }

    fn parse_transition(&mut self, tokens: &[&str]) {
        let Some((&name_raw, rest)) = tokens.split_first() else { return };
        let transition = strip_braces(name_raw);
        let rest = skip_label(rest);
        let Some(arrow) = rest.iter().position(|&t| t == "->") else { return };

        let pre: Vec<String> = rest[..arrow].iter().map(|t| arc_place(t)).collect();
        let post: Vec<String> = rest[arrow + 1..].iter().map(|t| arc_place(t)).collect();
        for place in pre.iter().chain(post.iter()) {
            if !self.places.contains(place) {
                self.places.push(place.clone());
            }
        }
        self.pre.push((transition.clone(), pre));
        self.post.push((transition, post));
    }

    /// Minimal `.pnml` support: just the place list, by regex over
    /// `<place>`/`<name><text>` elements. Sufficient for a reduced net,
    /// which this crate never fires transitions on.
    fn parse_pnml(path: &Path) -> Result<PetriNet> {
        let text = Self::read(path)?;
        let place_re = Regex::new(r#"(?s)<place\s+id="([^"]+)".*?</place>"#).expect("static regex");
        let name_re = Regex::new(r"(?s)<name>\s*<text>([^<]*)</text>").expect("static regex");

        let mut net = PetriNet::default();
        for capture in place_re.captures_iter(&text) {
            let id = &capture[1];
            let block = &capture[0];
            let place = name_re
                .captures(block)
                .map_or_else(|| id.to_string(), |c| c[1].to_string());
            net.places.push(place);
        }
        for (i, place) in net.places.iter().enumerate() {
            net.order.insert(place.clone(), i);
        }
        Ok(net)
    }

    /// Export the `.nupn` text format consumed by the oracle, per
    /// `examples/original_source/kong/pt.py`'s `export_nupn`.
    pub fn export_nupn(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        out.push_str("!creator kong 2.0.0\n");

        let order: HashMap<String, usize> = if let Some(nupn) = &self.nupn {
            nupn.place_order()
        } else {
            self.places
                .iter()
                .enumerate()
                .map(|(i, p)| (p.clone(), i))
                .collect()
        };

        let mut ordered_places = self.places.clone();
        ordered_places.sort_by_key(|p| order[p]);

        if let Some(nupn) = &self.nupn {
            if nupn.unit_safe {
                out.push_str("!unit_safe unknown/tool\n");
            }
        }

        out.push_str(&format!(
            "places #{} 0...{}\n",
            self.places.len(),
            self.places.len().saturating_sub(1)
        ));
        let initial_indices: Vec<String> = self
            .initial_places
            .iter()
            .map(|p| order[p].to_string())
            .collect();
        out.push_str(&format!(
            "initial places #{}{}\n",
            self.initial_places.len(),
            if initial_indices.is_empty() {
                String::new()
            } else {
                format!(" {}", initial_indices.join(" "))
            }
        ));

        if let Some(nupn) = &self.nupn {
            out.push_str(&nupn.render_units(&order));
        } else {
            out.push_str(&format!("units #{} 0...{}\n", self.places.len() + 1, self.places.len()));
            out.push_str("root unit 0\n");
            let rest: Vec<String> = (1..=self.places.len()).map(|i| i.to_string()).collect();
            out.push_str(&format!(
                "U0 #0 1...0 #{}{}\n",
                self.places.len(),
                if rest.is_empty() { String::new() } else { format!(" {}", rest.join(" ")) }
            ));
            for place in &ordered_places {
                let idx = order[place];
                out.push_str(&format!("U{} #1 {idx}...{idx} #0\n", idx + 1));
            }
        }

        let (start, end) = if self.pre.is_empty() { (1, 0) } else { (0, self.pre.len() as i64 - 1) };
        out.push_str(&format!("transitions #{} {start}...{end}\n", self.pre.len()));
        for (i, (_, pre)) in self.pre.iter().enumerate() {
            let post = &self.post[i].1;
            let pre_idx: Vec<String> = pre.iter().map(|p| order[p].to_string()).collect();
            let post_idx: Vec<String> = post.iter().map(|p| order[p].to_string()).collect();
            out.push_str(&format!(
                "T{i} #{}{} #{}{}\n",
                pre.len(),
                if pre_idx.is_empty() { String::new() } else { format!(" {}", pre_idx.join(" ")) },
                post.len(),
                if post_idx.is_empty() { String::new() } else { format!(" {}", post_idx.join(" ")) },
            ));
        }

        fs::write(path, out).map_err(|e| KongError::io(path, e))
    }
}

fn strip_braces(token: &str) -> String {
    token.replace(['{', '}'], "")
}

fn arc_place(token: &str) -> String {
    let place = token.split('*').next().unwrap_or(token);
    strip_braces(place)
}

/// Transition labels (`: name` or `: {multi word}`) precede the arc list;
/// skip past them to find the arrow.
fn skip_label(tokens: &[&str]) -> &[&str] {
    if tokens.first() != Some(&":") {
        return tokens;
    }
    let Some(&second) = tokens.get(1) else { return tokens };
    if !second.starts_with('{') {
        return &tokens[2..];
    }
    let mut index = 2;
    while index < tokens.len() && !tokens[index].ends_with('}') {
        index += 1;
    }
    &tokens[(index + 1).min(tokens.len())..]
}
