// src/scenes.rs

use clap::ValueEnum;
use glam::Vec3;
use kryon_core::Result;
use kryon_layout::{
    DepthAlignment, ElementId, ElementKind, FixedSizeContent, Orientation, StripDefinition, Thickness, UiTree,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scene {
    Grid,
    Stack,
    Canvas,
    Uniform,
    Content,
}

impl Scene {
    /// Builds the scene and returns its tree with the root element.
    pub fn build(self) -> Result<(UiTree, ElementId)> {
        let mut tree = UiTree::new();
        let root = match self {
            Scene::Grid => build_grid(&mut tree)?,
            Scene::Stack => build_stack(&mut tree)?,
            Scene::Canvas => build_canvas(&mut tree)?,
            Scene::Uniform => build_uniform(&mut tree)?,
            Scene::Content => build_content(&mut tree)?,
        };
        tree.set_name(root, format!("{:?}", self).to_lowercase())?;
        Ok((tree, root))
    }
}

fn fixed(tree: &mut UiTree, size: Vec3) -> ElementId {
    tree.add_element(ElementKind::leaf(FixedSizeContent(size)))
}

fn build_grid(tree: &mut UiTree) -> Result<ElementId> {
    let grid = tree.add_element(ElementKind::grid());
    tree.add_strip(grid, Orientation::Horizontal, StripDefinition::fixed(120.0))?;
    tree.add_strip(grid, Orientation::Horizontal, StripDefinition::star(1.0).with_minimum(50.0))?;
    tree.add_strip(grid, Orientation::Horizontal, StripDefinition::auto())?;
    tree.add_strip(grid, Orientation::Vertical, StripDefinition::auto())?;
    tree.add_strip(grid, Orientation::Vertical, StripDefinition::star(2.0))?;
    tree.add_strip(grid, Orientation::Vertical, StripDefinition::star(1.0).with_maximum(80.0))?;

    let header = fixed(tree, Vec3::new(0.0, 40.0, 10.0));
    tree.set_grid_span(header, Orientation::Horizontal, 3)?;
    tree.add_child(grid, header)?;

    let sidebar = fixed(tree, Vec3::new(100.0, 0.0, 10.0));
    tree.set_grid_position(sidebar, Orientation::Vertical, 1)?;
    tree.set_grid_span(sidebar, Orientation::Vertical, 2)?;
    tree.add_child(grid, sidebar)?;

    let body = fixed(tree, Vec3::new(200.0, 200.0, 10.0));
    tree.set_grid_position(body, Orientation::Horizontal, 1)?;
    tree.set_grid_position(body, Orientation::Vertical, 1)?;
    tree.add_child(grid, body)?;

    let tools = fixed(tree, Vec3::new(64.0, 64.0, 10.0));
    tree.set_grid_position(tools, Orientation::Horizontal, 2)?;
    tree.set_grid_position(tools, Orientation::Vertical, 2)?;
    tree.add_child(grid, tools)?;
    Ok(grid)
}

fn build_stack(tree: &mut UiTree) -> Result<ElementId> {
    let stack = tree.add_element(ElementKind::stack_panel_with(Orientation::Horizontal));
    for (index, size) in [Vec3::new(80.0, 40.0, 10.0), Vec3::new(120.0, 60.0, 20.0), Vec3::new(60.0, 80.0, 5.0)]
        .into_iter()
        .enumerate()
    {
        let child = fixed(tree, size);
        tree.set_margin(child, Thickness::uniform(index as f32 * 4.0))?;
        tree.add_child(stack, child)?;
    }
    Ok(stack)
}

fn build_canvas(tree: &mut UiTree) -> Result<ElementId> {
    let canvas = tree.add_element(ElementKind::canvas());
    tree.set_depth_alignment(canvas, DepthAlignment::Stretch)?;

    let centered = fixed(tree, Vec3::new(100.0, 50.0, 0.0));
    tree.set_canvas_relative_position(centered, Vec3::new(0.5, 0.5, 0.0))?;
    tree.set_canvas_pin_origin(centered, Vec3::new(0.5, 0.5, 0.0))?;
    tree.add_child(canvas, centered)?;

    let corner = fixed(tree, Vec3::new(30.0, 30.0, 0.0));
    tree.set_canvas_absolute_position(corner, Vec3::new(10.0, 10.0, 0.0))?;
    tree.add_child(canvas, corner)?;

    let banner = tree.add_element(ElementKind::Empty);
    tree.set_canvas_relative_size(banner, Vec3::new(1.0, 0.1, f32::NAN))?;
    tree.set_canvas_relative_position(banner, Vec3::new(0.0, 1.0, 0.0))?;
    tree.set_canvas_pin_origin(banner, Vec3::new(0.0, 1.0, 0.0))?;
    tree.add_child(canvas, banner)?;
    Ok(canvas)
}

fn build_uniform(tree: &mut UiTree) -> Result<ElementId> {
    let grid = tree.add_element(ElementKind::uniform_grid_with(3, 2, 1));
    for index in 0..5 {
        let child = fixed(tree, Vec3::new(40.0, 30.0, 10.0));
        tree.set_grid_position(child, Orientation::Horizontal, index % 3)?;
        tree.set_grid_position(child, Orientation::Vertical, index / 3)?;
        tree.add_child(grid, child)?;
    }
    let wide = fixed(tree, Vec3::new(80.0, 30.0, 10.0));
    tree.set_grid_position(wide, Orientation::Horizontal, 2)?;
    tree.set_grid_position(wide, Orientation::Vertical, 1)?;
    tree.add_child(grid, wide)?;
    Ok(grid)
}

fn build_content(tree: &mut UiTree) -> Result<ElementId> {
    let control = tree.add_element(ElementKind::content_control());
    tree.set_padding(control, Thickness::new(8.0, 4.0, 0.0, 8.0, 4.0, 0.0))?;
    let stack = tree.add_element(ElementKind::stack_panel());
    for height in [20.0, 30.0] {
        let line = fixed(tree, Vec3::new(150.0, height, 0.0));
        tree.add_child(stack, line)?;
    }
    tree.set_content(control, Some(stack))?;
    Ok(control)
}
