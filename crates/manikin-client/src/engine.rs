use std::path::PathBuf;
use std::sync::Arc;

use glam::{Quat, Vec2, Vec3};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowId};

use manikin_core::components::{Camera, Heading, Limb, LimbKind, Player, Transform};
use manikin_core::controller::{limb_swing, DynamicController, KinematicController};
use manikin_core::transform;

use crate::camera::{CameraRig, CameraState};
use crate::cli::CliArgs;
use crate::input::InputState;
use crate::mesh::MeshCache;
use crate::physics::{ColliderComp, PhysicsBodyType, PhysicsWorld, RigidBodyComp};
use crate::renderer::{DrawUniformPool, GpuState};
use crate::scene::{CameraRigMode, ControllerMode};
use crate::world::SceneWorld;

/// Which movement variant drives the player this session.
enum ControllerVariant {
    Kinematic(KinematicController),
    Dynamic(DynamicController),
}

/// Handles to the player entity assembled at scene load.
struct PlayerRig {
    entity: hecs::Entity,
    visual_root: hecs::Entity,
    rb_handle: rapier3d::prelude::RigidBodyHandle,
    col_handle: rapier3d::prelude::ColliderHandle,
    variant: ControllerVariant,
    camera_mode: CameraRigMode,
}

/// Main engine struct implementing winit's ApplicationHandler.
pub struct Engine {
    pub args: CliArgs,
    pub project_root: PathBuf,
    pub gpu: Option<GpuState>,

    pub scene_world: Option<SceneWorld>,
    pub mesh_cache: MeshCache,
    pub camera_state: Option<CameraState>,
    pub draw_pool: Option<DrawUniformPool>,
    pub forward_pipeline: Option<wgpu::RenderPipeline>,

    pub input_state: Option<InputState>,
    pub physics_world: Option<PhysicsWorld>,
    pub camera_rig: Option<CameraRig>,
    player: Option<PlayerRig>,

    start_time: instant::Instant,
    last_frame_time: Option<instant::Instant>,
    delta_time: f32,
}

impl Engine {
    pub fn new(args: CliArgs) -> Self {
        let project_root = PathBuf::from(&args.project);
        Self {
            args,
            project_root,
            gpu: None,
            scene_world: None,
            mesh_cache: MeshCache::new(),
            camera_state: None,
            draw_pool: None,
            forward_pipeline: None,
            input_state: None,
            physics_world: None,
            camera_rig: None,
            player: None,
            start_time: instant::Instant::now(),
            last_frame_time: None,
            delta_time: 1.0 / 60.0,
        }
    }

    /// Build the render resources, load the scene, and wire up the
    /// player rig and physics bodies.
    fn load_scene(&mut self) {
        let gpu = match &self.gpu {
            Some(gpu) => gpu,
            None => return,
        };

        let scene_path = self.project_root.join(&self.args.scene);
        let scene = match crate::scene::load_scene(&scene_path) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to load scene {:?}: {}", scene_path, e);
                return;
            }
        };

        let camera_state = CameraState::new(&gpu.device);
        let draw_pool = DrawUniformPool::new(&gpu.device);
        let forward_pipeline = crate::renderer::create_forward_pipeline(
            &gpu.device,
            crate::shader::forward_wgsl(),
            gpu.config.format,
            &camera_state.bind_group_layout,
            &draw_pool.bind_group_layout,
        );

        let mut scene_world = SceneWorld::new();
        {
            let device = &gpu.device;
            let cache = &mut self.mesh_cache;
            let mut make_mesh =
                |shape: &crate::scene::ShapeDef| cache.get_or_create(device, shape);
            scene_world.spawn_all_entities(&scene, &mut make_mesh);
        }

        let gravity = Vec3::from_array(scene.settings.gravity);
        let mut physics_world = PhysicsWorld::new(gravity);

        for entity_def in &scene.entities {
            let Some(&entity) = scene_world.entity_registry.get(&entity_def.id) else {
                continue;
            };
            let (pos, rot) = match &entity_def.components.transform {
                Some(t) => (
                    Vec3::from_array(t.position),
                    crate::world::euler_degrees_to_quat(t.rotation),
                ),
                None => (Vec3::ZERO, Quat::IDENTITY),
            };

            if let Some(cc_def) = &entity_def.components.character_controller {
                let device = &gpu.device;
                let cache = &mut self.mesh_cache;
                let mut make_mesh =
                    |shape: &crate::scene::ShapeDef| cache.get_or_create(device, shape);

                let half_height = (cc_def.height / 2.0 - cc_def.radius).max(0.1);
                let (rb_handle, col_handle) = match cc_def.mode {
                    ControllerMode::Kinematic => physics_world.add_character_body(
                        entity,
                        pos,
                        half_height,
                        cc_def.radius,
                    ),
                    ControllerMode::Dynamic => physics_world.add_dynamic_body(
                        entity,
                        pos,
                        &crate::scene::ShapeDef::Capsule {
                            height: cc_def.height,
                            radius: cc_def.radius,
                        },
                        1.0,
                        0.0,
                        0.5,
                        true,
                    ),
                };

                let body_type = match cc_def.mode {
                    ControllerMode::Kinematic => PhysicsBodyType::Kinematic,
                    ControllerMode::Dynamic => PhysicsBodyType::Dynamic,
                };
                let _ = scene_world.world.insert(
                    entity,
                    (
                        RigidBodyComp {
                            handle: rb_handle,
                            body_type,
                        },
                        ColliderComp { handle: col_handle },
                    ),
                );

                let visual_root =
                    scene_world.spawn_character_rig(entity, cc_def, &mut make_mesh);

                let variant = match cc_def.mode {
                    ControllerMode::Kinematic => {
                        ControllerVariant::Kinematic(KinematicController {
                            speed: cc_def.move_speed,
                            sprint_multiplier: cc_def.sprint_multiplier,
                            gravity: gravity.y,
                            jump_force: cc_def.jump,
                            rest_height: cc_def.height / 2.0,
                            ..Default::default()
                        })
                    }
                    // Scene speed is meters per second; the dynamic
                    // controller works in per-frame units.
                    ControllerMode::Dynamic => ControllerVariant::Dynamic(DynamicController {
                        speed: cc_def.move_speed / 60.0,
                        jump_impulse: cc_def.jump,
                        ..Default::default()
                    }),
                };

                self.camera_rig = Some(CameraRig::new(cc_def.camera));
                self.player = Some(PlayerRig {
                    entity,
                    visual_root,
                    rb_handle,
                    col_handle,
                    variant,
                    camera_mode: cc_def.camera,
                });
            } else if let Some(col_def) = &entity_def.components.collider {
                let rb_def = entity_def.components.rigid_body.as_ref();
                let body_type = rb_def.map(|rb| rb.body_type.as_str()).unwrap_or("static");
                let restitution = rb_def.map(|rb| rb.restitution).unwrap_or(0.0);
                let friction = rb_def.map(|rb| rb.friction).unwrap_or(0.5);

                match body_type {
                    "dynamic" => {
                        let mass = rb_def.map(|rb| rb.mass).unwrap_or(1.0);
                        let (rb_handle, col_handle) = physics_world.add_dynamic_body(
                            entity,
                            pos,
                            &col_def.shape,
                            mass,
                            restitution,
                            friction,
                            false,
                        );
                        let _ = scene_world.world.insert(
                            entity,
                            (
                                RigidBodyComp {
                                    handle: rb_handle,
                                    body_type: PhysicsBodyType::Dynamic,
                                },
                                ColliderComp { handle: col_handle },
                            ),
                        );
                    }
                    _ => {
                        let (rb_handle, col_handle) = physics_world.add_static_body(
                            entity,
                            pos,
                            rot,
                            &col_def.shape,
                            restitution,
                            friction,
                        );
                        let _ = scene_world.world.insert(
                            entity,
                            (
                                RigidBodyComp {
                                    handle: rb_handle,
                                    body_type: PhysicsBodyType::Static,
                                },
                                ColliderComp { handle: col_handle },
                            ),
                        );
                    }
                }
            }
        }
        physics_world.refresh_queries();

        let bindings = crate::input::load_bindings(&self.project_root);
        self.input_state = Some(InputState::new(bindings));

        self.scene_world = Some(scene_world);
        self.physics_world = Some(physics_world);
        self.camera_state = Some(camera_state);
        self.draw_pool = Some(draw_pool);
        self.forward_pipeline = Some(forward_pipeline);
        self.last_frame_time = Some(instant::Instant::now());

        if self.camera_rig.is_none() {
            self.camera_rig = Some(CameraRig::new(CameraRigMode::Orbit));
        }

        tracing::info!("Scene '{}' ready", scene.name);
    }

    /// Whether mouse motion should drive the camera rig this frame. The
    /// orbit rig only turns while the cursor is captured; the follow rig
    /// also turns while the look button is held.
    fn look_active(&self) -> bool {
        let Some(input) = &self.input_state else {
            return false;
        };
        let follow = self
            .player
            .as_ref()
            .is_some_and(|p| p.camera_mode == CameraRigMode::Follow);
        input.cursor_captured || (follow && input.pressed("look"))
    }

    /// Advance the player one frame: look, movement variant, limb swing.
    fn update_player(&mut self, dt: f32) {
        let look_active = self.look_active();
        let (Some(input), Some(scene_world), Some(physics_world), Some(rig), Some(camera_rig)) = (
            &self.input_state,
            &mut self.scene_world,
            &mut self.physics_world,
            &mut self.player,
            &mut self.camera_rig,
        ) else {
            return;
        };

        if look_active {
            camera_rig.apply_look(input.mouse_delta());
        }

        let axis = input.axis_2d("move_forward", "move_backward", "move_left", "move_right");
        let yaw = camera_rig.yaw;

        match &mut rig.variant {
            ControllerVariant::Kinematic(controller) => {
                let position_y = physics_world.body_position(rig.rb_handle).y;
                let step = controller.step(
                    axis,
                    yaw,
                    input.pressed("jump"),
                    input.pressed("sprint"),
                    position_y,
                    dt,
                );
                physics_world.move_character(rig.rb_handle, rig.col_handle, step.displacement, dt);

                if let Some(heading) = step.heading {
                    if let Ok(mut h) = scene_world.world.get::<&mut Heading>(rig.visual_root) {
                        h.yaw = heading;
                    }
                }
            }
            ControllerVariant::Dynamic(controller) => {
                let position_y = physics_world.body_position(rig.rb_handle).y;
                let current_velocity = physics_world.linear_velocity(rig.rb_handle);
                let step = controller.step(
                    axis,
                    yaw,
                    input.just_pressed("jump"),
                    current_velocity,
                    position_y,
                );

                physics_world.set_linear_velocity(rig.rb_handle, step.velocity);
                if step.jump {
                    physics_world.apply_vertical_impulse(rig.rb_handle, controller.jump_impulse);
                }
                if let Ok(mut h) = scene_world.world.get::<&mut Heading>(rig.visual_root) {
                    h.yaw = step.heading;
                }
            }
        }

        crate::world::apply_headings(&mut scene_world.world);

        if let Ok(mut player) = scene_world.world.get::<&mut Player>(rig.entity) {
            player.yaw = camera_rig.yaw;
            player.pitch = camera_rig.pitch;
        }

        // Cosmetic limb swing, a function of wall-clock time.
        let moving = axis != Vec2::ZERO;
        let swing = limb_swing(self.start_time.elapsed().as_secs_f32(), moving);
        for (_entity, (limb, transform)) in
            scene_world.world.query_mut::<(&Limb, &mut Transform)>()
        {
            let angle = match limb.kind {
                LimbKind::Arm => swing.arm,
                LimbKind::Leg => swing.leg,
            };
            transform.rotation = Quat::from_rotation_x(angle * limb.side);
            transform.dirty = true;
        }
    }

    /// Write this frame's camera uniform from the rig and scene settings.
    fn update_camera(&mut self) {
        let (Some(gpu), Some(scene_world), Some(camera_state), Some(camera_rig)) = (
            &self.gpu,
            &self.scene_world,
            &mut self.camera_state,
            &self.camera_rig,
        ) else {
            return;
        };

        let player_position = self
            .player
            .as_ref()
            .and_then(|rig| {
                scene_world
                    .world
                    .get::<&Transform>(rig.entity)
                    .ok()
                    .map(|t| t.position)
            })
            .unwrap_or(Vec3::ZERO);

        let (eye, focus) = camera_rig.view(player_position);

        let (fov, near, far) = scene_world
            .main_camera()
            .and_then(|e| scene_world.world.get::<&Camera>(e).ok().map(|c| {
                (c.fov_degrees, c.near, c.far)
            }))
            .unwrap_or_else(|| {
                let c = Camera::default();
                (c.fov_degrees, c.near, c.far)
            });

        camera_state.update(
            &gpu.queue,
            eye,
            focus,
            fov,
            near,
            far,
            gpu.config.width,
            gpu.config.height,
            Vec3::from_array(scene_world.settings.sun_direction),
            Vec3::from_array(scene_world.settings.ambient_light),
        );
    }

    fn release_cursor(&mut self) {
        if let Some(gpu) = &self.gpu {
            let _ = gpu.window.set_cursor_grab(winit::window::CursorGrabMode::None);
            gpu.window.set_cursor_visible(true);
        }
        if let Some(input) = &mut self.input_state {
            input.cursor_captured = false;
        }
    }

    fn capture_cursor(&mut self) {
        if let Some(gpu) = &self.gpu {
            let _ = gpu
                .window
                .set_cursor_grab(winit::window::CursorGrabMode::Locked)
                .or_else(|_| {
                    gpu.window
                        .set_cursor_grab(winit::window::CursorGrabMode::Confined)
                });
            gpu.window.set_cursor_visible(false);
        }
        if let Some(input) = &mut self.input_state {
            input.cursor_captured = true;
        }
    }

    fn tick(&mut self) {
        let now = instant::Instant::now();
        if let Some(last) = self.last_frame_time {
            self.delta_time = now.duration_since(last).as_secs_f32().min(0.1);
        }
        self.last_frame_time = Some(now);
        let dt = self.delta_time;

        // Escape releases the cursor; a click or a movement/jump key
        // captures it again, the pointer-lock-on-click analog.
        let escape_held = self
            .input_state
            .as_ref()
            .is_some_and(|input| input.key_held(KeyCode::Escape));
        if escape_held {
            self.release_cursor();
        }
        let should_capture = self.input_state.as_ref().is_some_and(|input| {
            !input.cursor_captured
                && (input.mouse_just_pressed(winit::event::MouseButton::Left)
                    || input.just_pressed("move_forward")
                    || input.just_pressed("move_backward")
                    || input.just_pressed("move_left")
                    || input.just_pressed("move_right")
                    || input.just_pressed("jump")
                    || input.just_pressed("look"))
        });
        if should_capture {
            self.capture_cursor();
        }

        self.update_player(dt);

        if let (Some(scene_world), Some(physics_world)) =
            (&mut self.scene_world, &mut self.physics_world)
        {
            physics_world.step(dt);
            physics_world.sync_to_ecs(&mut scene_world.world);
            transform::propagate(&mut scene_world.world);
        }

        self.update_camera();

        if let (
            Some(gpu),
            Some(scene_world),
            Some(camera_state),
            Some(draw_pool),
            Some(pipeline),
        ) = (
            &self.gpu,
            &self.scene_world,
            &self.camera_state,
            &self.draw_pool,
            &self.forward_pipeline,
        ) {
            crate::renderer::render_scene(
                gpu,
                scene_world,
                camera_state,
                draw_pool,
                &self.mesh_cache,
                pipeline,
                scene_world.settings.clear_color,
            );
        }

        if let Some(input) = &mut self.input_state {
            input.begin_frame();
        }
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

impl ApplicationHandler for Engine {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        tracing::info!("Application resumed, initializing GPU");

        let window_attrs = Window::default_attributes()
            .with_title("manikin")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        let gpu_state = pollster::block_on(crate::renderer::init_gpu(Arc::clone(&window)));
        self.gpu = Some(gpu_state);

        self.load_scene();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(input) = &mut self.input_state {
            input.handle_window_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    if new_size.width > 0 && new_size.height > 0 {
                        gpu.config.width = new_size.width;
                        gpu.config.height = new_size.height;
                        gpu.surface.configure(&gpu.device, &gpu.config);

                        let (depth_texture, depth_view) = crate::renderer::create_depth_texture(
                            &gpu.device,
                            new_size.width,
                            new_size.height,
                        );
                        gpu.depth_texture = depth_texture;
                        gpu.depth_view = depth_view;
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.tick();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        if let Some(input) = &mut self.input_state {
            input.handle_device_event(&event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}
