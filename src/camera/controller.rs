use glam::{Quat, Vec2, Vec3};

use crate::camera::core::{Camera, CameraUniform};
use crate::options::{CameraOptions, LightingOptions};

/// Radians of orbit per pixel of pointer motion at `rotate_speed = 1`.
const ROTATE_SCALE: f32 = 0.01;
/// Fraction of the orbit distance panned per pixel at `pan_speed = 1`.
const PAN_SCALE: f32 = 0.002;
/// Smallest bounding radius used when fitting, so a lone atom is not
/// filled edge to edge.
const MIN_FIT_RADIUS: f32 = 1.5;

/// Orbital camera: a focus point, a distance and a quaternion orientation.
///
/// Holds no GPU state; the renderer turns [`uniform`](Self::uniform) into
/// buffer contents.
#[derive(Debug, Clone)]
pub struct CameraController {
    orientation: Quat,
    distance: f32,
    focus_point: Vec3,
    home_focus: Vec3,
    home_distance: f32,

    /// Projection state derived from the orbit parameters.
    pub camera: Camera,
    uniform: CameraUniform,

    min_distance: f32,
    max_distance: f32,
    fit_margin: f32,
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,
}

impl CameraController {
    /// Camera looking down `-Z` at the origin from `initial_distance`.
    pub fn new(options: &CameraOptions, width: u32, height: u32) -> Self {
        let focus_point = Vec3::ZERO;
        let distance = options.initial_distance;

        let camera = Camera {
            eye: focus_point + Vec3::new(0.0, 0.0, distance),
            target: focus_point,
            up: Vec3::Y,
            aspect: aspect_ratio(width, height),
            fovy: options.fovy,
            znear: options.znear,
            zfar: options.zfar,
        };

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera);

        Self {
            orientation: Quat::IDENTITY,
            distance,
            focus_point,
            home_focus: focus_point,
            home_distance: distance,
            camera,
            uniform,
            min_distance: options.min_distance,
            max_distance: options.max_distance,
            fit_margin: options.fit_margin,
            rotate_speed: options.rotate_speed,
            pan_speed: options.pan_speed,
            zoom_speed: options.zoom_speed,
        }
    }

    /// Re-read projection limits and sensitivities, keeping the current
    /// view.
    pub fn apply_options(&mut self, options: &CameraOptions) {
        self.camera.fovy = options.fovy;
        self.camera.znear = options.znear;
        self.camera.zfar = options.zfar;
        self.min_distance = options.min_distance;
        self.max_distance = options.max_distance;
        self.fit_margin = options.fit_margin;
        self.rotate_speed = options.rotate_speed;
        self.pan_speed = options.pan_speed;
        self.zoom_speed = options.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
        self.update_camera_pos();
    }

    fn update_camera_pos(&mut self) {
        let dir = self.orientation * Vec3::Z;

        self.camera.eye = self.focus_point + (dir * self.distance);
        self.camera.target = self.focus_point;
        self.camera.up = self.orientation * Vec3::Y;
    }

    /// Uniform contents for the current view and `lighting`.
    pub fn uniform(&mut self, lighting: &LightingOptions) -> CameraUniform {
        self.uniform.update_view_proj(&self.camera);
        self.uniform.update_lighting(lighting);
        self.uniform
    }

    /// Track a new viewport size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.aspect = aspect_ratio(width, height);
    }

    /// Orbit around the focus point by a pointer delta in pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        let speed = self.rotate_speed * ROTATE_SCALE;

        // yaw about the camera's up vector, then pitch about its right
        let up = self.orientation * Vec3::Y;
        let horizontal_rotation = Quat::from_axis_angle(up, -delta.x * speed);
        self.orientation = horizontal_rotation * self.orientation;

        let right = self.orientation * Vec3::X;
        let vertical_rotation = Quat::from_axis_angle(right, -delta.y * speed);
        self.orientation = (vertical_rotation * self.orientation).normalize();

        self.update_camera_pos();
    }

    /// Rotate about the view axis by `angle` radians.
    pub fn roll(&mut self, angle: f32) {
        let forward = self.orientation * Vec3::Z;
        self.orientation =
            (Quat::from_axis_angle(forward, angle) * self.orientation).normalize();
        self.update_camera_pos();
    }

    /// Slide the focus point in the view plane by a pointer delta in pixels.
    pub fn pan(&mut self, delta: Vec2) {
        let right = self.orientation * Vec3::X;
        let up = self.orientation * Vec3::Y;
        let speed = self.pan_speed * PAN_SCALE * self.distance;

        let translation = right * (-delta.x * speed) + up * (delta.y * speed);

        self.focus_point += translation;
        self.update_camera_pos();
    }

    /// Move toward (positive) or away from (negative) the focus point.
    pub fn zoom(&mut self, delta: f32) {
        let factor = (1.0 - delta * self.zoom_speed).max(0.05);
        self.distance = (self.distance * factor)
            .clamp(self.min_distance, self.max_distance);
        self.update_camera_pos();
    }

    /// Adjust camera to fit the given positions, centering on their centroid
    /// and setting distance so all points are visible. The result becomes
    /// the view restored by [`reset`](Self::reset).
    pub fn fit_to_positions(&mut self, positions: &[Vec3], padding: f32) {
        if positions.is_empty() {
            return;
        }

        let centroid: Vec3 =
            positions.iter().copied().sum::<Vec3>() / positions.len() as f32;
        let radius = positions
            .iter()
            .map(|p| (*p - centroid).length())
            .fold(0.0f32, f32::max);
        self.fit_sphere(centroid, radius + padding);
    }

    /// Frame a bounding sphere, looking down `-Z`.
    pub fn fit_sphere(&mut self, center: Vec3, radius: f32) {
        let radius = radius.max(MIN_FIT_RADIUS);
        // the narrower of the two fields of view bounds the fit
        let half_fovy = self.camera.fovy.to_radians() / 2.0;
        let half_fovx = (half_fovy.tan() * self.camera.aspect).atan();
        let half_fov = half_fovy.min(half_fovx);
        let fit_distance = radius / half_fov.sin() * self.fit_margin;

        self.orientation = Quat::IDENTITY;
        self.focus_point = center;
        self.distance = fit_distance.clamp(self.min_distance, self.max_distance);
        self.home_focus = self.focus_point;
        self.home_distance = self.distance;
        self.update_camera_pos();
    }

    /// Return to the last fitted view.
    pub fn reset(&mut self) {
        self.orientation = Quat::IDENTITY;
        self.focus_point = self.home_focus;
        self.distance = self.home_distance;
        self.update_camera_pos();
    }

    /// Current focus point.
    pub fn focus_point(&self) -> Vec3 {
        self.focus_point
    }

    /// Current distance from the focus point.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Current orientation.
    pub fn orientation(&self) -> Quat {
        self.orientation
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
