// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reader for OpenCV's `opencv-cascade-classifier` XML layout, as shipped in
// `haarcascade_*.xml`:
//
//   <opencv_storage><cascade>
//     <stageType>BOOST</stageType> <featureType>HAAR</featureType>
//     <height>24</height> <width>24</width>
//     <stages><_>
//       <stageThreshold>-5.04</stageThreshold>
//       <weakClassifiers><_>
//         <internalNodes>0 -1 0 -3.15e-02</internalNodes>
//         <leafValues>2.08 -2.21</leafValues>
//       </_></weakClassifiers>
//     </_></stages>
//     <features><_><rects><_>6 4 12 9 -1.</_><_>6 7 12 3 3.</_></rects></_></features>
//   </cascade></opencv_storage>
//
// Only single-split (stump) weak classifiers over upright Haar features are
// accepted. `internalNodes` is `left right feature threshold`; a stump's
// first leaf is the vote below the threshold.

use std::str::FromStr;

use roxmltree::{Document, Node};

use crate::cascade::{ClassifierModel, Feature, ModelError, Stage, WeakClassifier, WeightedRect};

pub(crate) fn parse(text: &str) -> Result<ClassifierModel, ModelError> {
    let doc = Document::parse(text)?;
    let cascade = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name("cascade"))
        .ok_or_else(|| {
            invalid("no <cascade> element; legacy haartraining files are not supported")
        })?;

    expect_text(cascade, "stageType", "BOOST")?;
    expect_text(cascade, "featureType", "HAAR")?;

    let width = scalar(cascade, "width")?;
    let height = scalar(cascade, "height")?;

    let features = items(child(cascade, "features")?)
        .enumerate()
        .map(|(i, node)| feature(node, i))
        .collect::<Result<Vec<_>, _>>()?;
    let stages = items(child(cascade, "stages")?)
        .enumerate()
        .map(|(i, node)| stage(node, i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClassifierModel {
        width,
        height,
        features,
        stages,
    })
}

fn stage(node: Node<'_, '_>, index: usize) -> Result<Stage, ModelError> {
    let weak_classifiers = items(child(node, "weakClassifiers")?)
        .map(|weak| stump(weak, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage {
        threshold: scalar(node, "stageThreshold")?,
        weak_classifiers,
    })
}

fn stump(node: Node<'_, '_>, stage: usize) -> Result<WeakClassifier, ModelError> {
    let internal = text(node, "internalNodes")?;
    let tokens: Vec<&str> = internal.split_whitespace().collect();
    let [_, _, feature, threshold] = tokens.as_slice() else {
        return Err(invalid(format!(
            "stage {stage}: only single-split weak classifiers are supported, got {internal:?}"
        )));
    };

    let leaves: Vec<f32> = numbers(text(node, "leafValues")?, "leafValues")?;
    let [left, right] = leaves.as_slice() else {
        return Err(invalid(format!(
            "stage {stage}: a stump needs two leaf values, got {}",
            leaves.len()
        )));
    };

    Ok(WeakClassifier {
        feature: number(feature, "internalNodes")?,
        threshold: number(threshold, "internalNodes")?,
        left: *left,
        right: *right,
    })
}

fn feature(node: Node<'_, '_>, index: usize) -> Result<Feature, ModelError> {
    if let Some(tilted) = child(node, "tilted").ok().and_then(|n| n.text()) {
        if tilted.trim() != "0" {
            return Err(invalid(format!("feature {index} is tilted")));
        }
    }

    let rects = items(child(node, "rects")?)
        .map(|rect| {
            let raw = rect.text().unwrap_or_default();
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            let [x, y, width, height, weight] = tokens.as_slice() else {
                return Err(invalid(format!(
                    "feature {index}: rectangle needs `x y w h weight`, got {raw:?}"
                )));
            };
            Ok(WeightedRect {
                x: number(x, "rects")?,
                y: number(y, "rects")?,
                width: number(width, "rects")?,
                height: number(height, "rects")?,
                weight: number(weight, "rects")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Feature { rects })
}

// -- Node helpers -------------------------------------------------------------

/// The `<_>` entries of an OpenCV sequence.
fn items<'a, 'i>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(|n| n.has_tag_name("_"))
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Result<Node<'a, 'i>, ModelError> {
    node.children().find(|n| n.has_tag_name(name)).ok_or_else(|| {
        invalid(format!("<{}> has no <{name}>", node.tag_name().name()))
    })
}

fn text<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, ModelError> {
    Ok(child(node, name)?.text().unwrap_or_default().trim())
}

/// Absent is fine; present with another value is not.
fn expect_text(node: Node<'_, '_>, name: &str, expected: &str) -> Result<(), ModelError> {
    match child(node, name) {
        Ok(found) => {
            let value = found.text().unwrap_or_default().trim();
            if value == expected {
                Ok(())
            } else {
                Err(invalid(format!("unsupported {name} {value:?}, expected {expected}")))
            }
        }
        Err(_) => Ok(()),
    }
}

fn scalar<T: FromStr>(node: Node<'_, '_>, name: &str) -> Result<T, ModelError> {
    number(text(node, name)?, name)
}

fn numbers<T: FromStr>(raw: &str, what: &str) -> Result<Vec<T>, ModelError> {
    raw.split_whitespace().map(|token| number(token, what)).collect()
}

fn number<T: FromStr>(token: &str, what: &str) -> Result<T, ModelError> {
    token
        .parse()
        .map_err(|_| invalid(format!("malformed number {token:?} in <{what}>")))
}

fn invalid(message: impl Into<String>) -> ModelError {
    ModelError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::tests::edge_model;

    const EDGE_XML: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>8</height>
  <width>8</width>
  <stageParams><maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams><maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 8 4 -1.</_>
        <_>
          0 4 8 4 1.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    #[test]
    fn reads_the_opencv_layout() {
        assert_eq!(parse(EDGE_XML).unwrap(), edge_model());
    }

    #[test]
    fn lbp_cascades_are_rejected() {
        let lbp = EDGE_XML.replace(
            "<featureType>HAAR</featureType>",
            "<featureType>LBP</featureType>",
        );
        let err = parse(&lbp).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(ref m) if m.contains("LBP")), "{err}");
    }

    #[test]
    fn tree_weak_classifiers_are_rejected() {
        let tree = EDGE_XML.replace(
            "0 -1 0 5.0000000000000000e-01",
            "1 -1 0 0.5 0 -2 0 0.25",
        );
        assert!(matches!(parse(&tree), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn tilted_features_are_rejected() {
        let tilted = EDGE_XML.replace("</rects></_>", "</rects><tilted>1</tilted></_>");
        let err = parse(&tilted).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(ref m) if m.contains("tilted")), "{err}");

        let upright = EDGE_XML.replace("</rects></_>", "</rects><tilted>0</tilted></_>");
        assert_eq!(parse(&upright).unwrap(), edge_model());
    }

    #[test]
    fn malformed_content_is_reported() {
        assert!(matches!(parse("<opencv_storage><cascade>"), Err(ModelError::Xml(_))));
        assert!(matches!(
            parse("<opencv_storage><other/></opencv_storage>"),
            Err(ModelError::Invalid(_))
        ));

        let bad_rect = EDGE_XML.replace("0 4 8 4 1.", "0 4 eight 4 1.");
        assert!(matches!(parse(&bad_rect), Err(ModelError::Invalid(_))));

        let one_leaf = EDGE_XML.replace("-1. 1.", "-1.");
        assert!(matches!(parse(&one_leaf), Err(ModelError::Invalid(_))));
    }
}
